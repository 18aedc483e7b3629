use oxigraph::model::{BlankNode, Dataset, GraphName, Quad, Triple};

/// A dataset under construction, together with the graphs the current
/// session is working on.
///
/// Data graphs are every graph that received data during the session, in
/// the order they first appeared. Metadata goes into one open metadata
/// graph until it is closed; the next metadata triple then opens a new one.
#[derive(Debug, Default)]
pub struct FocusStore {
    dataset: Dataset,
    current_graph: Option<BlankNode>,
    data_graphs: Vec<BlankNode>,
    metadata_graph: Option<BlankNode>,
    metadata_graphs: Vec<BlankNode>,
}

impl FocusStore {
    pub fn new() -> FocusStore {
        FocusStore::default()
    }

    /// Continue building on top of an existing dataset. Its graphs are not
    /// tracked as data graphs of the session.
    pub fn over(dataset: Dataset) -> FocusStore {
        FocusStore {
            dataset,
            ..FocusStore::default()
        }
    }

    /// Start a fresh data graph for [`FocusStore::add_triples`].
    pub fn open_graph(&mut self) -> BlankNode {
        let graph = BlankNode::default();
        self.track(&graph);
        self.current_graph = Some(graph.clone());
        graph
    }

    pub fn close_graph(&mut self) {
        self.current_graph = None;
    }

    pub fn current_graph(&self) -> Option<&BlankNode> {
        self.current_graph.as_ref()
    }

    /// Add triples to the current data graph, opening one if needed.
    pub fn add_triples(&mut self, triples: impl IntoIterator<Item = Triple>) {
        let graph = match &self.current_graph {
            Some(graph) => graph.clone(),
            None => self.open_graph(),
        };
        for triple in triples {
            self.dataset.insert(&triple.in_graph(graph.clone()));
        }
    }

    /// Add quads as data. Blank graph names become data graphs.
    pub fn add_quads(&mut self, quads: impl IntoIterator<Item = Quad>) {
        for quad in quads {
            if let GraphName::BlankNode(graph) = &quad.graph_name {
                self.track(graph);
            }
            self.dataset.insert(&quad);
        }
    }

    /// Add triples to the open metadata graph, opening one if needed.
    /// Returns the graph they went into.
    pub fn add_metadata_triples(&mut self, triples: impl IntoIterator<Item = Triple>) -> BlankNode {
        let graph = match &self.metadata_graph {
            Some(graph) => graph.clone(),
            None => {
                let graph = BlankNode::default();
                self.metadata_graphs.push(graph.clone());
                self.metadata_graph = Some(graph.clone());
                graph
            }
        };
        for triple in triples {
            self.dataset.insert(&triple.in_graph(graph.clone()));
        }
        graph
    }

    /// Freeze the open metadata graph. Returns it, if there was one.
    pub fn close_metadata_graph(&mut self) -> Option<BlankNode> {
        self.metadata_graph.take()
    }

    pub fn data_graphs(&self) -> &[BlankNode] {
        &self.data_graphs
    }

    pub fn metadata_graph(&self) -> Option<&BlankNode> {
        self.metadata_graph.as_ref()
    }

    /// Every metadata graph opened during the session, closed ones included.
    pub fn metadata_graphs(&self) -> &[BlankNode] {
        &self.metadata_graphs
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn into_dataset(self) -> Dataset {
        self.dataset
    }

    fn track(&mut self, graph: &BlankNode) {
        if !self.data_graphs.contains(graph) {
            self.data_graphs.push(graph.clone());
        }
    }
}
