//! Python Bindings
//!
//! Exposes a broadcaster over arbitrary Python objects. Python has `None`, so
//! this is where the absent-value check actually bites: `publish(None)`
//! raises `ValueError`.
//!
//! ```python
//! from relay._core import Broadcaster
//!
//! actions = Broadcaster(name="actions", on_misuse="log")
//! sub = actions.subscribe(lambda action: print("got", action))
//! actions.publish("refresh")
//! sub.cancel()
//! ```

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::broadcast::{Broadcaster, Listener, Subscription};
use crate::config::{BroadcasterConfig, MisusePolicy};
use crate::error::BroadcastError;

impl From<BroadcastError> for PyErr {
    fn from(err: BroadcastError) -> Self {
        PyValueError::new_err(err.to_string())
    }
}

/// Listener calling a Python callable with each value.
struct PyCallbackListener {
    callback: Py<PyAny>,
}

impl Listener<Py<PyAny>> for PyCallbackListener {
    fn on_value(&self, value: &Py<PyAny>) {
        Python::with_gil(|py| {
            // A raising callback must not break delivery to the others.
            if let Err(err) = self.callback.call1(py, (value.clone_ref(py),)) {
                tracing::warn!(error = %err, "python listener raised");
            }
        });
    }
}

/// Python-exposed Broadcaster type.
#[pyclass(name = "Broadcaster")]
pub struct PyBroadcaster {
    inner: Broadcaster<Py<PyAny>>,
}

#[pymethods]
impl PyBroadcaster {
    /// Create a new broadcaster.
    #[new]
    #[pyo3(signature = (name=None, on_misuse="log"))]
    fn new(name: Option<String>, on_misuse: &str) -> PyResult<Self> {
        let on_misuse: MisusePolicy = on_misuse.parse().map_err(PyValueError::new_err)?;
        Ok(Self {
            inner: Broadcaster::with_config(BroadcasterConfig { name, on_misuse }),
        })
    }

    /// Deliver a value to every subscriber. `None` raises `ValueError`.
    fn publish(&self, value: Option<PyObject>) -> PyResult<()> {
        self.inner.try_publish(value)?;
        Ok(())
    }

    /// Register a callable; returns its subscription.
    fn subscribe(&self, py: Python<'_>, callback: PyObject) -> PyResult<PySubscription> {
        if !callback.bind(py).is_callable() {
            return Err(PyValueError::new_err("listener must be callable"));
        }
        let inner = self.inner.subscribe(PyCallbackListener { callback });
        Ok(PySubscription { inner })
    }

    /// Get the number of active subscriptions.
    fn observer_count(&self) -> usize {
        self.inner.observer_count()
    }

    fn __repr__(&self) -> String {
        format!(
            "Broadcaster(name={}, observers={})",
            self.inner.name().unwrap_or("None"),
            self.inner.observer_count()
        )
    }
}

/// Python-exposed Subscription type.
#[pyclass(name = "Subscription")]
pub struct PySubscription {
    inner: Subscription<Py<PyAny>>,
}

#[pymethods]
impl PySubscription {
    /// Stop receiving values. Safe to call repeatedly.
    fn cancel(&self) {
        self.inner.cancel();
    }

    /// Whether `cancel` has been called.
    #[getter]
    fn cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }

    fn __repr__(&self) -> String {
        format!(
            "Subscription(id={}, cancelled={})",
            self.inner.id(),
            self.inner.is_cancelled()
        )
    }
}
