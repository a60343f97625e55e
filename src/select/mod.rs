//! The whitespace-separated selector engine (spec component C6).
//!
//! A selector is a string split on runs of whitespace into an ordered
//! list of steps. Each step resolves against a dictionary (literal
//! key), a list (`first`, `last`, or a decimal index), or is always a
//! miss against a scalar.
use thiserror::Error;

use crate::bencode::Value;

/// A parsed selector: an ordered sequence of steps. The empty selector
/// (no steps) is the null selector, which selects the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    steps: Vec<String>,
}

impl Selector {
    pub fn parse(text: &str) -> Selector {
        let steps = text
            .split(|c: char| matches!(c, ' ' | '\t' | '\n' | '\x0c'))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Selector { steps }
    }

    pub fn is_null(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[String] {
        &self.steps
    }
}

/// Why a selector operation failed. Carries the 1-indexed step number
/// at which resolution broke down.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("step {step}: no match for {key:?}")]
    Miss { step: usize, key: String },

    #[error("step {step}: cannot index into a scalar value")]
    ScalarIndexed { step: usize },

    #[error("step {step}: list index {index} out of range")]
    IndexOutOfRange { step: usize, index: String },

    #[error("cannot set or delete at the null selector")]
    NullSelector,
}

enum ListStep {
    First,
    Last,
    Index(i64),
}

fn parse_list_step(step: &str) -> Option<ListStep> {
    match step {
        "first" => Some(ListStep::First),
        "last" => Some(ListStep::Last),
        _ => step.parse::<i64>().ok().map(ListStep::Index),
    }
}

fn resolve_step<'v>(value: &'v Value, step: &str, step_no: usize) -> Result<&'v Value, SelectorError> {
    match value {
        Value::Dict(map) => map.get(step.as_bytes()).ok_or_else(|| SelectorError::Miss {
            step: step_no,
            key: step.to_string(),
        }),
        Value::List(list) => {
            let list_step = parse_list_step(step).ok_or_else(|| SelectorError::Miss {
                step: step_no,
                key: step.to_string(),
            })?;
            match list_step {
                ListStep::First => list.first().ok_or_else(|| SelectorError::Miss {
                    step: step_no,
                    key: step.to_string(),
                }),
                ListStep::Last => list.last().ok_or_else(|| SelectorError::Miss {
                    step: step_no,
                    key: step.to_string(),
                }),
                ListStep::Index(i) => {
                    if i < 0 || i as usize >= list.len() {
                        return Err(SelectorError::Miss {
                            step: step_no,
                            key: step.to_string(),
                        });
                    }
                    Ok(&list[i as usize])
                }
            }
        }
        Value::Bytes(_) | Value::Integer(_) => Err(SelectorError::Miss {
            step: step_no,
            key: step.to_string(),
        }),
    }
}

/// Resolves `selector` against `root`, folding every step.
pub fn select<'v>(root: &'v Value, selector: &Selector) -> Result<&'v Value, SelectorError> {
    let mut current = root;
    for (i, step) in selector.steps().iter().enumerate() {
        current = resolve_step(current, step, i + 1)?;
    }
    Ok(current)
}

fn resolve_mut_step<'v>(
    value: &'v mut Value,
    step: &str,
    step_no: usize,
) -> Result<&'v mut Value, SelectorError> {
    match value {
        Value::Dict(map) => map.get_mut(step.as_bytes()).ok_or_else(|| SelectorError::Miss {
            step: step_no,
            key: step.to_string(),
        }),
        Value::List(list) => {
            let list_step = parse_list_step(step).ok_or_else(|| SelectorError::Miss {
                step: step_no,
                key: step.to_string(),
            })?;
            let len = list.len();
            match list_step {
                ListStep::First => list.first_mut().ok_or_else(|| SelectorError::Miss {
                    step: step_no,
                    key: step.to_string(),
                }),
                ListStep::Last => list.last_mut().ok_or_else(|| SelectorError::Miss {
                    step: step_no,
                    key: step.to_string(),
                }),
                ListStep::Index(i) => {
                    if i < 0 || i as usize >= len {
                        return Err(SelectorError::Miss {
                            step: step_no,
                            key: step.to_string(),
                        });
                    }
                    Ok(&mut list[i as usize])
                }
            }
        }
        Value::Bytes(_) | Value::Integer(_) => Err(SelectorError::Miss {
            step: step_no,
            key: step.to_string(),
        }),
    }
}

/// Folds every step but the last, returning the parent container and
/// the final step's text.
fn fold_to_parent<'v>(
    root: &'v mut Value,
    selector: &Selector,
) -> Result<(&'v mut Value, &str), SelectorError> {
    let steps = selector.steps();
    let (last, init) = steps.split_last().expect("selector is non-null");

    let mut current = root;
    for (i, step) in init.iter().enumerate() {
        current = resolve_mut_step(current, step, i + 1)?;
    }
    Ok((current, last))
}

/// Attaches `new_value` at the location named by `selector`.
///
/// Folds all but the last step (a miss there is a hard failure), then
/// attaches at the final step per the container-specific rules in the
/// selector engine's contract.
pub fn set(root: &mut Value, selector: &Selector, new_value: Value) -> Result<(), SelectorError> {
    if selector.is_null() {
        return Err(SelectorError::NullSelector);
    }
    let last_step_no = selector.steps().len();
    let (parent, last) = fold_to_parent(root, selector)?;

    match parent {
        Value::Dict(map) => {
            map.insert(last.as_bytes().to_vec(), new_value);
            Ok(())
        }
        Value::List(list) => match parse_list_step(last) {
            Some(ListStep::First) => {
                if list.is_empty() {
                    list.push(new_value);
                } else {
                    list[0] = new_value;
                }
                Ok(())
            }
            Some(ListStep::Last) => {
                if list.is_empty() {
                    list.push(new_value);
                } else {
                    let idx = list.len() - 1;
                    list[idx] = new_value;
                }
                Ok(())
            }
            Some(ListStep::Index(i)) => {
                if i < 0 || i as usize >= list.len() {
                    return Err(SelectorError::IndexOutOfRange {
                        step: last_step_no,
                        index: last.to_string(),
                    });
                }
                list[i as usize] = new_value;
                Ok(())
            }
            None => Err(SelectorError::Miss {
                step: last_step_no,
                key: last.to_string(),
            }),
        },
        Value::Bytes(_) | Value::Integer(_) => Err(SelectorError::ScalarIndexed { step: last_step_no }),
    }
}

/// Removes the value named by `selector`'s final step from its
/// container. A miss at the final step is a hard failure.
pub fn delete(root: &mut Value, selector: &Selector) -> Result<(), SelectorError> {
    if selector.is_null() {
        return Err(SelectorError::NullSelector);
    }
    let last_step_no = selector.steps().len();
    let (parent, last) = fold_to_parent(root, selector)?;

    match parent {
        Value::Dict(map) => {
            map.remove(last.as_bytes())
                .map(|_| ())
                .ok_or_else(|| SelectorError::Miss {
                    step: last_step_no,
                    key: last.to_string(),
                })
        }
        Value::List(list) => {
            let index = match parse_list_step(last) {
                Some(ListStep::First) if !list.is_empty() => Some(0),
                Some(ListStep::Last) if !list.is_empty() => Some(list.len() - 1),
                Some(ListStep::Index(i)) if i >= 0 && (i as usize) < list.len() => Some(i as usize),
                _ => None,
            };
            match index {
                Some(i) => {
                    list.remove(i);
                    Ok(())
                }
                None => Err(SelectorError::Miss {
                    step: last_step_no,
                    key: last.to_string(),
                }),
            }
        }
        Value::Bytes(_) | Value::Integer(_) => Err(SelectorError::ScalarIndexed { step: last_step_no }),
    }
}
