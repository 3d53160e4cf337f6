//! In-process variable registry
//!
//! Holds the current value of every announced variable behind a lock so other
//! tasks can read consistent snapshots while the replay writes.

use super::{PublishingSink, SinkError, SinkResult, VariableHandle};
use crate::Scalar;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::RwLock;
use tracing::debug;

/// A published variable and its current value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variable {
    /// Variable name (column name)
    pub name: String,
    /// Current value
    pub value: Scalar,
    /// Number of updates received since announcement
    pub updates: u64,
}

/// Thread-safe in-memory sink
#[derive(Debug, Default)]
pub struct MemorySink {
    variables: RwLock<Vec<Variable>>,
}

impl MemorySink {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every variable, in announcement order
    pub fn snapshot(&self) -> Vec<Variable> {
        match self.variables.read() {
            Ok(variables) => variables.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Current value of a variable by name
    pub fn value(&self, name: &str) -> Option<Scalar> {
        self.snapshot()
            .into_iter()
            .find(|v| v.name == name)
            .map(|v| v.value)
    }

    /// Number of announced variables
    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    /// Whether nothing has been announced yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PublishingSink for MemorySink {
    async fn announce(&self, name: &str, initial: &Scalar) -> SinkResult<VariableHandle> {
        let mut variables = self.variables.write().map_err(|_| SinkError::Rejected {
            name: name.to_string(),
            reason: "registry lock poisoned".to_string(),
        })?;

        if variables.iter().any(|v| v.name == name) {
            return Err(SinkError::Rejected {
                name: name.to_string(),
                reason: "variable already announced".to_string(),
            });
        }

        let id = variables.len();
        variables.push(Variable {
            name: name.to_string(),
            value: initial.clone(),
            updates: 0,
        });
        debug!(variable = %name, id, value = %initial, "Variable registered");
        Ok(VariableHandle::new(id, name))
    }

    async fn update(&self, handle: &VariableHandle, value: &Scalar) -> SinkResult<()> {
        let mut variables = self.variables.write().map_err(|_| SinkError::Rejected {
            name: handle.name().to_string(),
            reason: "registry lock poisoned".to_string(),
        })?;

        let variable = variables
            .get_mut(handle.id())
            .filter(|v| v.name == handle.name())
            .ok_or(SinkError::UnknownHandle(handle.id()))?;
        variable.value = value.clone();
        variable.updates += 1;
        Ok(())
    }
}
