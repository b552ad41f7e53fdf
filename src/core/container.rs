use std::cell::Cell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::Size;

static NEXT_CONTAINER_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(u64);

impl ContainerId {
    #[must_use]
    pub fn raw(self) -> u64 {
        self.0
    }
}

struct ContainerInner {
    id: ContainerId,
    size: Cell<Size>,
    attached: Cell<bool>,
    parent: Option<ChartContainer>,
}

/// Host-side container element the chart instance is bound to.
///
/// Cloning yields another handle to the same element.
#[derive(Clone)]
pub struct ChartContainer {
    inner: Rc<ContainerInner>,
}

impl ChartContainer {
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self::build(size, None)
    }

    #[must_use]
    pub fn with_parent(size: Size, parent: &ChartContainer) -> Self {
        Self::build(size, Some(parent.clone()))
    }

    fn build(size: Size, parent: Option<ChartContainer>) -> Self {
        Self {
            inner: Rc::new(ContainerInner {
                id: ContainerId(NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed)),
                size: Cell::new(size),
                attached: Cell::new(true),
                parent,
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> ContainerId {
        self.inner.id
    }

    #[must_use]
    pub fn size(&self) -> Size {
        self.inner.size.get()
    }

    /// Records a new committed layout size. Observers are notified by the
    /// host through `ResizeHub`, not by this setter.
    pub fn set_size(&self, size: Size) {
        self.inner.size.set(size);
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.inner.attached.get()
    }

    pub fn detach(&self) {
        self.inner.attached.set(false);
    }

    pub fn attach(&self) {
        self.inner.attached.set(true);
    }

    #[must_use]
    pub fn parent(&self) -> Option<&ChartContainer> {
        self.inner.parent.as_ref()
    }
}

impl PartialEq for ChartContainer {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for ChartContainer {}

impl fmt::Debug for ChartContainer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChartContainer")
            .field("id", &self.inner.id)
            .field("size", &self.inner.size.get())
            .field("attached", &self.inner.attached.get())
            .finish()
    }
}
