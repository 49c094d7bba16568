//! Dense tensors with named dimensions.
//!
//! A tensor over inputs `x_1 : bint(n_1), ..., x_k : bint(n_k)` is stored as a
//! flat row-major buffer of `n_1 * ... * n_k` reals. Operations align operands
//! by variable name rather than by position, broadcasting over dimensions an
//! operand does not have.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::{
    domain::{Domain, Inputs, VarSet, merge_inputs},
    error::{TermError, TermResult},
    ops::AssocOp,
    text::Name,
};

/// A materialised tensor.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    inputs: Inputs,
    output: Domain,
    data: Arc<[f64]>,
}

impl Tensor {
    /// Create a tensor from row-major data over `inputs`.
    pub fn new(inputs: Inputs, output: Domain, data: Vec<f64>) -> TermResult<Self> {
        let shape = shape_of(&inputs)?;
        let expected = shape.iter().product();
        if data.len() != expected {
            return Err(TermError::ShapeMismatch {
                expected,
                found: data.len(),
            });
        }
        Ok(Tensor {
            inputs,
            output,
            data: data.into(),
        })
    }

    /// A real scalar.
    pub fn scalar(value: f64) -> Self {
        Tensor {
            inputs: Inputs::new(),
            output: Domain::Real,
            data: Arc::from([value]),
        }
    }

    /// The tensor `name -> name` over `0..size`, with output `bint(size)`.
    pub fn arange(name: Name, size: usize) -> Self {
        Tensor {
            inputs: IndexMap::from([(name, Domain::Bint(size))]),
            output: Domain::Bint(size),
            data: (0..size).map(|i| i as f64).collect(),
        }
    }

    /// Check that every entry is a valid index when the output is `bint`.
    /// `name` is the variable these entries will index.
    pub(crate) fn check_indices(&self, name: &Name) -> TermResult<()> {
        if self.output == Domain::Real {
            return Ok(());
        }
        match self.data.iter().find(|&&x| as_index(x, self.output).is_none()) {
            Some(&index) => Err(TermError::IndexOutOfRange {
                name: name.clone(),
                index,
                domain: self.output,
            }),
            None => Ok(()),
        }
    }

    /// Build a tensor by evaluating `f` at every index.
    pub fn from_fn(
        inputs: Inputs,
        output: Domain,
        mut f: impl FnMut(&[usize]) -> f64,
    ) -> TermResult<Self> {
        let shape = shape_of(&inputs)?;
        let mut data = Vec::with_capacity(shape.iter().product());
        for_each_index(&shape, |idx| data.push(f(idx)));
        Tensor::new(inputs, output, data)
    }

    /// Free variables of this tensor.
    pub fn inputs(&self) -> &Inputs {
        &self.inputs
    }

    /// Domain of each entry.
    pub fn output(&self) -> Domain {
        self.output
    }

    /// Row-major entries.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Sizes of each input, in order.
    pub fn shape(&self) -> Vec<usize> {
        self.inputs.values().filter_map(|d| d.size()).collect()
    }

    /// The value of a tensor without inputs.
    pub fn item(&self) -> Option<f64> {
        self.inputs.is_empty().then(|| self.data[0])
    }

    /// Entry at a positional index, `None` if out of range.
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        let shape = self.shape();
        if index.len() != shape.len() || index.iter().zip(&shape).any(|(i, n)| i >= n) {
            return None;
        }
        let offset: usize = index.iter().zip(strides(&shape)).map(|(i, s)| i * s).sum();
        Some(self.data[offset])
    }

    /// Entry at a named index. Names not among the inputs are ignored.
    pub fn at(&self, index: &[(&str, usize)]) -> Option<f64> {
        let positional = self
            .inputs
            .keys()
            .map(|name| {
                index
                    .iter()
                    .find(|(n, _)| *n == name.as_str())
                    .map(|(_, i)| *i)
            })
            .collect::<Option<Vec<_>>>()?;
        self.get(&positional)
    }

    /// Every positional index paired with its entry, in row-major order.
    pub fn entries(&self) -> Vec<(Vec<usize>, f64)> {
        let mut out = Vec::with_capacity(self.data.len());
        let mut data = self.data.iter();
        for_each_index(&self.shape(), |idx| {
            if let Some(v) = data.next() {
                out.push((idx.to_vec(), *v));
            }
        });
        out
    }

    /// Pointwise `op`, aligning by name. The result has the inputs of `lhs`
    /// followed by the new inputs of `rhs`.
    pub fn binary(op: AssocOp, lhs: &Tensor, rhs: &Tensor) -> TermResult<Tensor> {
        let mut inputs = lhs.inputs.clone();
        merge_inputs(&mut inputs, &rhs.inputs).map_err(|(name, first, second)| {
            TermError::DomainMismatch {
                name,
                first,
                second,
            }
        })?;
        let shape = shape_of(&inputs)?;
        let lhs_strides = broadcast_strides(&lhs.inputs, &inputs);
        let rhs_strides = broadcast_strides(&rhs.inputs, &inputs);
        let mut data = Vec::with_capacity(shape.iter().product());
        for_each_index(&shape, |idx| {
            let x = lhs.data[dot(idx, &lhs_strides)];
            let y = rhs.data[dot(idx, &rhs_strides)];
            data.push(op.apply(x, y));
        });
        Ok(Tensor {
            inputs,
            output: op.result_domain(lhs.output, rhs.output),
            data: data.into(),
        })
    }

    /// Reduce over `vars` with `op`. Variables this tensor lacks are ignored.
    pub fn reduce(&self, op: AssocOp, vars: &VarSet) -> Tensor {
        if !self.inputs.keys().any(|k| vars.contains(k)) {
            return self.clone();
        }
        let kept: Inputs = self
            .inputs
            .iter()
            .filter(|(k, _)| !vars.contains(*k))
            .map(|(k, d)| (k.clone(), *d))
            .collect();
        // Strides into the kept layout, zero on reduced dimensions.
        let kept_strides = broadcast_strides(&kept, &self.inputs);
        let mut acc = vec![op.identity(); kept.values().filter_map(|d| d.size()).product()];
        let mut data = self.data.iter();
        for_each_index(&self.shape(), |idx| {
            if let Some(v) = data.next() {
                let slot = &mut acc[dot(idx, &kept_strides)];
                *slot = op.apply(*slot, *v);
            }
        });
        Tensor {
            inputs: kept,
            output: op.reduce_domain(self.output),
            data: acc.into(),
        }
    }

    /// Reorder dimensions. `order` must name every input exactly once.
    pub fn permute(&self, order: &[Name]) -> Tensor {
        let inputs: Inputs = order
            .iter()
            .filter_map(|name| self.inputs.get(name).map(|d| (name.clone(), *d)))
            .collect();
        debug_assert_eq!(inputs.len(), self.inputs.len());
        if inputs.keys().eq(self.inputs.keys()) {
            return self.clone();
        }
        let src_strides = broadcast_strides(&self.inputs, &inputs);
        let mut data = Vec::with_capacity(self.data.len());
        for_each_index(&self.shape_in(&inputs), |idx| {
            data.push(self.data[dot(idx, &src_strides)]);
        });
        Tensor {
            inputs,
            output: self.output,
            data: data.into(),
        }
    }

    /// Simultaneously replace inputs by index tensors.
    ///
    /// Each replacement's entries select positions along the replaced
    /// dimension; its own inputs become inputs of the result.
    pub fn substitute(&self, bindings: &IndexMap<Name, Tensor>) -> TermResult<Tensor> {
        let bindings: IndexMap<&Name, &Tensor> = bindings
            .iter()
            .filter(|(k, _)| self.inputs.contains_key(*k))
            .collect();
        if bindings.is_empty() {
            return Ok(self.clone());
        }

        let mut inputs = Inputs::new();
        for (name, domain) in &self.inputs {
            let added = match bindings.get(name) {
                Some(value) => value.inputs.clone(),
                None => IndexMap::from([(name.clone(), *domain)]),
            };
            merge_inputs(&mut inputs, &added).map_err(|(name, first, second)| {
                TermError::DomainMismatch {
                    name,
                    first,
                    second,
                }
            })?;
        }

        enum Source<'a> {
            Kept(usize),
            Indexed(&'a Tensor, Vec<usize>),
        }
        let sources = self
            .inputs
            .keys()
            .map(|name| match bindings.get(name) {
                Some(value) => Source::Indexed(value, broadcast_strides(&value.inputs, &inputs)),
                None => Source::Kept(inputs.get_index_of(name).unwrap_or_default()),
            })
            .collect::<Vec<_>>();
        let old_strides = strides(&self.shape());

        let mut data = Vec::new();
        let mut failure = None;
        for_each_index(&shape_of(&inputs)?, |idx| {
            if failure.is_some() {
                return;
            }
            let mut offset = 0;
            for ((source, stride), (name, domain)) in
                sources.iter().zip(&old_strides).zip(&self.inputs)
            {
                let i = match source {
                    Source::Kept(pos) => idx[*pos],
                    Source::Indexed(value, value_strides) => {
                        let raw = value.data[dot(idx, value_strides)];
                        match as_index(raw, *domain) {
                            Some(i) => i,
                            None => {
                                failure = Some(TermError::IndexOutOfRange {
                                    name: name.clone(),
                                    index: raw,
                                    domain: *domain,
                                });
                                return;
                            }
                        }
                    }
                };
                offset += i * stride;
            }
            data.push(self.data[offset]);
        });
        if let Some(err) = failure {
            return Err(err);
        }
        Ok(Tensor {
            inputs,
            output: self.output,
            data: data.into(),
        })
    }

    fn shape_in(&self, inputs: &Inputs) -> Vec<usize> {
        inputs.values().filter_map(|d| d.size()).collect()
    }
}

fn as_index(raw: f64, domain: Domain) -> Option<usize> {
    let size = domain.size()?;
    (raw >= 0.0 && raw.fract() == 0.0 && (raw as usize) < size).then_some(raw as usize)
}

/// Sizes of `inputs`, rejecting real-valued inputs.
pub(crate) fn shape_of(inputs: &Inputs) -> TermResult<Vec<usize>> {
    inputs
        .iter()
        .map(|(name, domain)| {
            domain.size().ok_or_else(|| TermError::UnboundedInput {
                name: name.clone(),
                domain: *domain,
            })
        })
        .collect()
}

fn strides(shape: &[usize]) -> Vec<usize> {
    let mut out = vec![1; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        out[i] = out[i + 1] * shape[i + 1];
    }
    out
}

/// For each dimension of `dst`, the stride of that name in `src`'s layout,
/// or zero if `src` lacks it.
fn broadcast_strides(src: &Inputs, dst: &Inputs) -> Vec<usize> {
    let src_shape: Vec<usize> = src.values().filter_map(|d| d.size()).collect();
    let src_strides = strides(&src_shape);
    dst.keys()
        .map(|name| src.get_index_of(name).map_or(0, |pos| src_strides[pos]))
        .collect()
}

fn dot(idx: &[usize], strides: &[usize]) -> usize {
    idx.iter().zip(strides).map(|(i, s)| i * s).sum()
}

/// Visit every index of `shape` in row-major order.
fn for_each_index(shape: &[usize], mut f: impl FnMut(&[usize])) {
    if shape.contains(&0) {
        return;
    }
    let mut idx = vec![0; shape.len()];
    loop {
        f(&idx);
        let mut dim = shape.len();
        loop {
            if dim == 0 {
                return;
            }
            dim -= 1;
            idx[dim] += 1;
            if idx[dim] < shape[dim] {
                break;
            }
            idx[dim] = 0;
        }
    }
}
