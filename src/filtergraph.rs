//! Minimal model of an ffmpeg `-filter_complex` graph.
//!
//! Nodes are collected in order and rendered once, so pad labels, `:`
//! separators and `;` chain separators are never hand-assembled.

use std::fmt;

#[derive(Debug, Clone, PartialEq)]
enum Param {
    Named(String, String),
    Positional(String),
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Named(key, value) => write!(f, "{key}={value}"),
            Param::Positional(value) => f.write_str(value),
        }
    }
}

/// One filter with its input and output pad labels.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterNode {
    inputs: Vec<String>,
    filter: String,
    params: Vec<Param>,
    outputs: Vec<String>,
}

impl FilterNode {
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            inputs: Vec::new(),
            filter: filter.into(),
            params: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn input(mut self, label: impl Into<String>) -> Self {
        self.inputs.push(label.into());
        self
    }

    pub fn inputs<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inputs.extend(labels.into_iter().map(Into::into));
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.params.push(Param::Named(key.into(), value.to_string()));
        self
    }

    pub fn arg(mut self, value: impl fmt::Display) -> Self {
        self.params.push(Param::Positional(value.to_string()));
        self
    }

    pub fn output(mut self, label: impl Into<String>) -> Self {
        self.outputs.push(label.into());
        self
    }
}

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for label in &self.inputs {
            write!(f, "[{label}]")?;
        }
        f.write_str(&self.filter)?;
        for (i, param) in self.params.iter().enumerate() {
            f.write_str(if i == 0 { "=" } else { ":" })?;
            write!(f, "{param}")?;
        }
        for label in &self.outputs {
            write!(f, "[{label}]")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterGraph {
    nodes: Vec<FilterNode>,
}

impl FilterGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: FilterNode) -> &mut Self {
        self.nodes.push(node);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Output label of the last node, which is what gets `-map`ped.
    pub fn final_output(&self) -> Option<&str> {
        self.nodes
            .last()
            .and_then(|n| n.outputs.last())
            .map(String::as_str)
    }

    pub fn count_filter(&self, name: &str) -> usize {
        self.nodes.iter().filter(|n| n.filter == name).count()
    }
}

impl fmt::Display for FilterGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{node}")?;
        }
        Ok(())
    }
}
