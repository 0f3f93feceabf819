use std::fmt;

/// A pipeline together with the project it belongs to. Child pipelines
/// triggered by multi-project bridges live in another project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRef {
    pub id: u64,
    pub project: String,
}

impl PipelineRef {
    pub fn new(id: u64, project: impl Into<String>) -> Self {
        Self {
            id,
            project: project.into(),
        }
    }
}

impl fmt::Display for PipelineRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.id)
    }
}

/// Drill-down path: the root pipeline plus every child entered through a
/// bridge job. The top is the pipeline on screen.
#[derive(Debug, Clone)]
pub struct PipelineStack {
    root: PipelineRef,
    children: Vec<PipelineRef>,
}

impl PipelineStack {
    pub fn new(root: PipelineRef) -> Self {
        Self {
            root,
            children: Vec::new(),
        }
    }

    pub fn top(&self) -> &PipelineRef {
        self.children.last().unwrap_or(&self.root)
    }

    pub fn push(&mut self, pipeline: PipelineRef) {
        self.children.push(pipeline);
    }

    /// Returns to the parent; `None` when already at the root.
    pub fn pop(&mut self) -> Option<PipelineRef> {
        self.children.pop()
    }

    pub fn is_root(&self) -> bool {
        self.children.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PipelineRef> {
        std::iter::once(&self.root).chain(self.children.iter())
    }
}
