//! # Dependency-Ordered Compute Graph
//!
//! Named variables, each with a kernel, a ping-pong texture pair and a
//! list of variables its kernel samples. One `compute()` runs every kernel
//! over every slot and then swaps all buffers at once.
//!
//! ## Step semantics
//!
//! Every kernel reads only *front* buffers (the previous step) and writes
//! only its own *back* buffer, so no kernel can observe a half-finished
//! step. That also makes dependency cycles between variables harmless:
//! the evaluation order only decides when each variable's readbacks are
//! delivered within a step.
//!
//! ## Lifecycle
//!
//! 1. `add_variable` / `set_dependencies`
//! 2. `init()` resolves names, checks kernel inputs, fixes the order
//! 3. `compute()` once per tick, `upload()` between ticks

use rayon::prelude::*;
use tracing::{debug, info};

use orbis_core::error::{OrbisError, OrbisResult};
use orbis_core::{Kernel, KernelInputs, Uniforms};

use crate::readback::{Readback, ReadbackQueue};
use crate::texture::{PingPong, SlotPatch, Texture};

/// Handle to a registered variable
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariableId(usize);

impl VariableId {
    #[cfg(test)]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Registration index
    pub fn index(self) -> usize {
        self.0
    }
}

struct Variable {
    name: String,
    kernel: Box<dyn Kernel>,
    buffers: PingPong,
    dependency_names: Vec<String>,
    dependencies: Vec<VariableId>,
}

/// The compute graph
pub struct ComputeGraph {
    width: usize,
    height: usize,
    variables: Vec<Variable>,
    order: Vec<VariableId>,
    uniforms: Uniforms,
    initialized: bool,
    steps: u64,
}

impl ComputeGraph {
    /// Create an empty graph whose variables are `width × height`
    pub fn new(width: usize, height: usize) -> OrbisResult<Self> {
        if width == 0 || height == 0 {
            return Err(OrbisError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            variables: Vec::new(),
            order: Vec::new(),
            uniforms: Uniforms::default(),
            initialized: false,
            steps: 0,
        })
    }

    /// Register a variable with its kernel and starting state
    pub fn add_variable(
        &mut self,
        name: &str,
        kernel: Box<dyn Kernel>,
        initial: Texture,
    ) -> OrbisResult<VariableId> {
        if self.find(name).is_some() {
            return Err(OrbisError::DuplicateVariable(name.to_string()));
        }
        if initial.width() != self.width || initial.height() != self.height {
            return Err(OrbisError::InvalidDimensions {
                width: initial.width(),
                height: initial.height(),
            });
        }

        let id = VariableId(self.variables.len());
        self.variables.push(Variable {
            name: name.to_string(),
            kernel,
            buffers: PingPong::new(initial),
            dependency_names: Vec::new(),
            dependencies: Vec::new(),
        });
        self.initialized = false;
        Ok(id)
    }

    /// Declare which variables the kernel of `variable` may sample
    ///
    /// Names are resolved by `init()`, so dependencies may be declared
    /// before the variables they name are registered.
    pub fn set_dependencies(&mut self, variable: VariableId, dependencies: &[&str]) -> OrbisResult<()> {
        if self.steps > 0 {
            return Err(OrbisError::config(
                "dependencies must be declared before the first compute()",
            ));
        }
        let entry = self
            .variables
            .get_mut(variable.0)
            .ok_or_else(|| OrbisError::unknown_variable(format!("#{}", variable.0)))?;
        entry.dependency_names = dependencies.iter().map(|d| d.to_string()).collect();
        self.initialized = false;
        Ok(())
    }

    /// Validate the graph and fix the evaluation order
    ///
    /// Returns the problem instead of failing, so the caller decides
    /// whether to abort or fall back.
    pub fn init(&mut self) -> Option<OrbisError> {
        if self.variables.is_empty() {
            return Some(OrbisError::config("compute graph has no variables"));
        }

        for index in 0..self.variables.len() {
            let mut resolved = Vec::with_capacity(self.variables[index].dependency_names.len());
            for dependency in &self.variables[index].dependency_names {
                match self.find(dependency) {
                    Some(id) => resolved.push(id),
                    None => {
                        return Some(OrbisError::MissingDependency {
                            variable: self.variables[index].name.clone(),
                            dependency: dependency.clone(),
                        })
                    }
                }
            }
            self.variables[index].dependencies = resolved;
        }

        for variable in &self.variables {
            for input in variable.kernel.inputs() {
                let declared = *input == variable.name
                    || variable.dependency_names.iter().any(|d| d == input);
                if !declared {
                    return Some(OrbisError::KernelInput {
                        kernel: variable.kernel.name().to_string(),
                        variable: variable.name.clone(),
                        input: input.to_string(),
                    });
                }
            }
        }

        let dependencies: Vec<Vec<usize>> = self
            .variables
            .iter()
            .map(|v| v.dependencies.iter().map(|d| d.0).collect())
            .collect();
        self.order = evaluation_order(&dependencies)
            .into_iter()
            .map(VariableId)
            .collect();
        self.initialized = true;

        info!(
            "🧮 Compute graph ready: {}x{} slots, order [{}]",
            self.width,
            self.height,
            self.order
                .iter()
                .map(|id| self.variables[id.0].name.as_str())
                .collect::<Vec<_>>()
                .join(" → ")
        );
        None
    }

    /// Run one step over every variable
    ///
    /// Right after a variable's kernel finishes, every request queued
    /// against it is removed from `readbacks` and delivered with a copy of
    /// the texture just computed. Deliveries come back in evaluation order,
    /// FIFO within a variable.
    pub fn compute<R>(&mut self, readbacks: &mut ReadbackQueue<R>) -> OrbisResult<Vec<Readback<R>>> {
        if !self.initialized {
            return Err(OrbisError::NotInitialized);
        }

        let mut delivered = Vec::new();

        for position in 0..self.order.len() {
            let id = self.order[position];
            let mut out = std::mem::take(self.variables[id.0].buffers.back_mut());

            {
                let variable = &self.variables[id.0];
                let inputs = KernelInputs::new(
                    self.width,
                    variable.buffers.front().texels(),
                    variable
                        .dependencies
                        .iter()
                        .map(|d| {
                            let dependency = &self.variables[d.0];
                            (dependency.name.as_str(), dependency.buffers.front().texels())
                        })
                        .collect(),
                );
                let kernel = variable.kernel.as_ref();
                let uniforms = &self.uniforms;

                out.texels_mut()
                    .par_iter_mut()
                    .enumerate()
                    .for_each(|(slot, texel)| {
                        *texel = kernel.evaluate(slot, &inputs, uniforms);
                    });
            }

            for request in readbacks.take(id) {
                delivered.push(Readback {
                    variable: id,
                    request,
                    data: out.clone(),
                });
            }

            *self.variables[id.0].buffers.back_mut() = out;
        }

        for variable in &mut self.variables {
            variable.buffers.swap();
        }
        self.steps += 1;

        if !delivered.is_empty() {
            debug!("📤 Step {}: delivered {} readbacks", self.steps, delivered.len());
        }
        Ok(delivered)
    }

    /// Write host-side slot patches into a variable's current state
    pub fn upload(&mut self, variable: VariableId, patches: &[SlotPatch]) -> OrbisResult<()> {
        self.variables
            .get_mut(variable.0)
            .ok_or_else(|| OrbisError::unknown_variable(format!("#{}", variable.0)))?
            .buffers
            .front_mut()
            .apply(patches)
    }

    /// Current state of a variable
    pub fn front(&self, variable: VariableId) -> OrbisResult<&Texture> {
        self.variables
            .get(variable.0)
            .map(|v| v.buffers.front())
            .ok_or_else(|| OrbisError::unknown_variable(format!("#{}", variable.0)))
    }

    /// Look up a variable by name
    pub fn find(&self, name: &str) -> Option<VariableId> {
        self.variables
            .iter()
            .position(|v| v.name == name)
            .map(VariableId)
    }

    /// Name of a variable
    pub fn name(&self, variable: VariableId) -> Option<&str> {
        self.variables.get(variable.0).map(|v| v.name.as_str())
    }

    /// Evaluation order fixed by `init()`
    pub fn order(&self) -> &[VariableId] {
        &self.order
    }

    pub fn set_uniforms(&mut self, uniforms: Uniforms) {
        self.uniforms = uniforms;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Completed steps
    pub fn steps(&self) -> u64 {
        self.steps
    }
}

/// Dependencies first; ties and cycles resolved by registration order
fn evaluation_order(dependencies: &[Vec<usize>]) -> Vec<usize> {
    let count = dependencies.len();
    let mut placed = vec![false; count];
    let mut order = Vec::with_capacity(count);

    while order.len() < count {
        let ready = (0..count).find(|&i| {
            !placed[i] && dependencies[i].iter().all(|&d| d == i || placed[d])
        });
        let next = match ready {
            Some(i) => i,
            None => {
                // Only a cycle is left; every kernel reads the previous
                // step, so any order is valid.
                let Some(i) = (0..count).find(|&i| !placed[i]) else {
                    break;
                };
                debug!("dependency cycle broken at variable #{}", i);
                i
            }
        };
        placed[next] = true;
        order.push(next);
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbis_core::Texel;

    /// Adds one to x of its own previous value
    struct Counter;

    impl Kernel for Counter {
        fn name(&self) -> &'static str {
            "counter"
        }

        fn inputs(&self) -> &'static [&'static str] {
            &[]
        }

        fn evaluate(&self, slot: usize, inputs: &KernelInputs<'_>, _: &Uniforms) -> Texel {
            let own = inputs.own(slot);
            Texel::new(own.x + 1.0, own.y, own.z, slot as f32)
        }
    }

    /// Copies the previous value of "counter"
    struct Mirror;

    impl Kernel for Mirror {
        fn name(&self) -> &'static str {
            "mirror"
        }

        fn inputs(&self) -> &'static [&'static str] {
            &["counter"]
        }

        fn evaluate(&self, slot: usize, inputs: &KernelInputs<'_>, _: &Uniforms) -> Texel {
            inputs.sample("counter", slot)
        }
    }

    fn graph() -> (ComputeGraph, VariableId, VariableId) {
        let mut graph = ComputeGraph::new(2, 2).unwrap();
        let mirror = graph
            .add_variable("mirror", Box::new(Mirror), Texture::new(2, 2).unwrap())
            .unwrap();
        let counter = graph
            .add_variable("counter", Box::new(Counter), Texture::new(2, 2).unwrap())
            .unwrap();
        graph.set_dependencies(mirror, &["counter"]).unwrap();
        (graph, counter, mirror)
    }

    #[test]
    fn test_duplicate_variable() {
        let (mut graph, _, _) = graph();
        let err = graph
            .add_variable("counter", Box::new(Counter), Texture::new(2, 2).unwrap())
            .unwrap_err();
        assert!(matches!(err, OrbisError::DuplicateVariable(name) if name == "counter"));
    }

    #[test]
    fn test_missing_dependency_reported_by_init() {
        let (mut graph, counter, _) = graph();
        graph.set_dependencies(counter, &["mass"]).unwrap();
        let err = graph.init().expect("init should report the missing dependency");
        assert!(matches!(err, OrbisError::MissingDependency { .. }));
        assert!(!graph.is_initialized());
    }

    #[test]
    fn test_undeclared_kernel_input() {
        let (mut graph, _, mirror) = graph();
        graph.set_dependencies(mirror, &[]).unwrap();
        assert!(matches!(graph.init(), Some(OrbisError::KernelInput { .. })));
    }

    #[test]
    fn test_compute_requires_init() {
        let (mut graph, _, _) = graph();
        let mut queue: ReadbackQueue<()> = ReadbackQueue::new();
        assert!(matches!(graph.compute(&mut queue), Err(OrbisError::NotInitialized)));
    }

    #[test]
    fn test_dependencies_evaluated_first() {
        let (mut graph, counter, mirror) = graph();
        assert!(graph.init().is_none());
        assert_eq!(graph.order(), &[counter, mirror]);
    }

    #[test]
    fn test_kernels_read_previous_step() {
        let (mut graph, counter, mirror) = graph();
        assert!(graph.init().is_none());
        let mut queue: ReadbackQueue<()> = ReadbackQueue::new();

        graph.compute(&mut queue).unwrap();
        graph.compute(&mut queue).unwrap();
        assert_eq!(graph.steps(), 2);

        // The mirror always lags one step behind the counter.
        assert_eq!(graph.front(counter).unwrap().read(0).unwrap().x, 2.0);
        assert_eq!(graph.front(mirror).unwrap().read(0).unwrap().x, 1.0);
    }

    #[test]
    fn test_readbacks_are_one_shot_and_ordered() {
        let (mut graph, counter, mirror) = graph();
        assert!(graph.init().is_none());
        let mut queue = ReadbackQueue::new();
        queue.request(mirror, "m");
        queue.request(counter, "c1");
        queue.request(counter, "c2");

        let delivered = graph.compute(&mut queue).unwrap();
        let requests: Vec<_> = delivered.iter().map(|r| r.request).collect();
        assert_eq!(requests, vec!["c1", "c2", "m"]);
        assert_eq!(delivered[0].data.read(3).unwrap(), Texel::new(1.0, 0.0, 0.0, 3.0));

        assert!(graph.compute(&mut queue).unwrap().is_empty());
    }

    #[test]
    fn test_upload_becomes_next_input() {
        let (mut graph, counter, _) = graph();
        assert!(graph.init().is_none());
        let mut queue: ReadbackQueue<()> = ReadbackQueue::new();

        graph
            .upload(counter, &[SlotPatch::new(1, Texel::new(10.0, 0.0, 0.0, 0.0))])
            .unwrap();
        graph.compute(&mut queue).unwrap();
        assert_eq!(graph.front(counter).unwrap().read(1).unwrap().x, 11.0);
        assert_eq!(graph.front(counter).unwrap().read(0).unwrap().x, 1.0);
    }

    #[test]
    fn test_cycle_falls_back_to_registration_order() {
        let order = evaluation_order(&[vec![0, 1], vec![1, 0], vec![0, 1]]);
        assert_eq!(order, vec![0, 1, 2]);
    }
}
