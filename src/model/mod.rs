//! Model capabilities the collector reads from
//!
//! The collector never owns a model. Each training step hands it a
//! [`ModelRef`], which is either a sequential stack of layers or a
//! graph-structured network; both expose the shared [`Model`] capability
//! set, and only sequential models can derive activation arrays.

use std::collections::BTreeMap;

use crate::error::{TelemetryError, TelemetryResult};

/// Ordered `(name, values)` pairs borrowed from a model
pub type NamedArrays<'a> = Vec<(String, &'a [f32])>;

/// Capabilities shared by every supported topology
pub trait Model {
    /// Type name reported in the initialization report
    fn model_class(&self) -> &str;

    /// Score (loss) after the current iteration
    fn score(&self) -> f64;

    /// Parameter arrays in a stable order
    fn parameters(&self) -> NamedArrays<'_>;

    /// Gradient (update) arrays, keyed the same way as the parameters
    fn gradients(&self) -> NamedArrays<'_>;

    /// Number of examples in the minibatch that was just processed
    fn batch_size(&self) -> Option<usize>;

    fn num_layers(&self) -> usize;

    fn num_params(&self) -> usize;

    /// Full model configuration as a JSON document
    fn configuration(&self) -> serde_json::Value;

    /// Learning rate per parameter, if the model exposes per-layer configuration
    fn learning_rates(&self) -> Option<BTreeMap<String, f64>> {
        None
    }

    /// Identifier of the numeric backend holding the arrays
    fn backend(&self) -> &str {
        "cpu"
    }

    /// Element type of the arrays
    fn dtype(&self) -> &str {
        "f32"
    }
}

/// A linear stack of layers
pub trait SequentialModel: Model {
    /// Input array each layer stored during the last forward pass, in layer order.
    ///
    /// Layer `i`'s input is layer `i - 1`'s activation. `None` for layers
    /// that have not seen any input yet.
    fn layer_inputs(&self) -> Vec<Option<&[f32]>>;
}

/// A network whose layers form a directed graph
pub trait GraphModel: Model {
    /// Number of vertices (layers and merge points) in the graph
    fn num_vertices(&self) -> usize;
}

/// Borrowed view of a model of one of the supported topologies
#[derive(Clone, Copy)]
pub enum ModelRef<'a> {
    Sequential(&'a dyn SequentialModel),
    Graph(&'a dyn GraphModel),
}

impl<'a> ModelRef<'a> {
    pub fn kind(&self) -> &'static str {
        match self {
            ModelRef::Sequential(_) => "sequential",
            ModelRef::Graph(_) => "graph",
        }
    }

    pub fn model_class(&self) -> &'a str {
        match *self {
            ModelRef::Sequential(m) => m.model_class(),
            ModelRef::Graph(m) => m.model_class(),
        }
    }

    pub fn score(&self) -> f64 {
        match *self {
            ModelRef::Sequential(m) => m.score(),
            ModelRef::Graph(m) => m.score(),
        }
    }

    pub fn parameters(&self) -> NamedArrays<'a> {
        match *self {
            ModelRef::Sequential(m) => m.parameters(),
            ModelRef::Graph(m) => m.parameters(),
        }
    }

    pub fn gradients(&self) -> NamedArrays<'a> {
        match *self {
            ModelRef::Sequential(m) => m.gradients(),
            ModelRef::Graph(m) => m.gradients(),
        }
    }

    /// Examples in the current minibatch, 0 when the model does not say
    pub fn batch_size(&self) -> usize {
        match *self {
            ModelRef::Sequential(m) => m.batch_size(),
            ModelRef::Graph(m) => m.batch_size(),
        }
        .unwrap_or(0)
    }

    pub fn num_layers(&self) -> usize {
        match *self {
            ModelRef::Sequential(m) => m.num_layers(),
            ModelRef::Graph(m) => m.num_layers(),
        }
    }

    pub fn num_params(&self) -> usize {
        match *self {
            ModelRef::Sequential(m) => m.num_params(),
            ModelRef::Graph(m) => m.num_params(),
        }
    }

    /// Vertex count of a graph model; `None` for sequential stacks
    pub fn num_vertices(&self) -> Option<usize> {
        match *self {
            ModelRef::Sequential(_) => None,
            ModelRef::Graph(m) => Some(m.num_vertices()),
        }
    }

    pub fn configuration(&self) -> serde_json::Value {
        match *self {
            ModelRef::Sequential(m) => m.configuration(),
            ModelRef::Graph(m) => m.configuration(),
        }
    }

    pub fn learning_rates(&self) -> Option<BTreeMap<String, f64>> {
        match *self {
            ModelRef::Sequential(m) => m.learning_rates(),
            ModelRef::Graph(m) => m.learning_rates(),
        }
    }

    pub fn backend(&self) -> &'a str {
        match *self {
            ModelRef::Sequential(m) => m.backend(),
            ModelRef::Graph(m) => m.backend(),
        }
    }

    pub fn dtype(&self) -> &'a str {
        match *self {
            ModelRef::Sequential(m) => m.dtype(),
            ModelRef::Graph(m) => m.dtype(),
        }
    }

    /// Ordered parameter names, used to keep report layout stable
    pub fn parameter_names(&self) -> Vec<String> {
        self.parameters().into_iter().map(|(name, _)| name).collect()
    }

    /// Activation arrays keyed by the index of the layer that produced them.
    ///
    /// The raw training input (layer 0's input) and the output layer's
    /// activations are not included. Graph models fail with
    /// [`TelemetryError::UnsupportedModel`]: one vertex can feed several
    /// others, so there is no single "next layer input" to read.
    pub fn activations(&self) -> TelemetryResult<NamedArrays<'a>> {
        match *self {
            ModelRef::Sequential(m) => Ok(m
                .layer_inputs()
                .into_iter()
                .enumerate()
                .skip(1)
                .filter_map(|(i, input)| input.map(|values| ((i - 1).to_string(), values)))
                .collect()),
            ModelRef::Graph(_) => Err(TelemetryError::unsupported_model(self.kind(), "activations")),
        }
    }
}

impl<'a> std::fmt::Debug for ModelRef<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRef")
            .field("kind", &self.kind())
            .field("class", &self.model_class())
            .finish()
    }
}
