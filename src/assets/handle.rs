//! Asynchronous operation handles
//!
//! An [`OperationHandle`] is the token a backend hands out for every load or
//! instantiate request. It carries a status, an optional result, and owns one
//! engine-side reference that must be given back exactly once through the
//! backend's `release`.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use futures_lite::FutureExt as _;

/// Global counter for generating unique handle IDs
static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> HandleId {
    HandleId(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed))
}

/// Type-erased loaded asset
pub type AssetRef = Rc<dyn Any>;

/// Downcast a type-erased asset to the type the caller expects
#[must_use]
pub fn downcast_asset<T: Any>(asset: AssetRef) -> Option<Rc<T>> {
    asset.downcast::<T>().ok()
}

/// Unique identifier of an operation handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    /// Get the raw id value
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The type a caller expects an asset to have
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetType {
    id: TypeId,
    name: &'static str,
}

impl AssetType {
    /// Describe the type `T`
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> TypeId {
        self.id
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Check whether a type-erased asset is of this type
    #[must_use]
    pub fn matches(&self, asset: &AssetRef) -> bool {
        (**asset).type_id() == self.id
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Progress of an asynchronous operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationStatus {
    /// Still running
    #[default]
    Pending,
    /// Completed with a result
    Succeeded,
    /// Completed without a result
    Failed,
}

struct OperationState<T> {
    status: OperationStatus,
    result: Option<T>,
    error: Option<String>,
    /// Never carries a message; closing it wakes every awaiting [`Completion`]
    done: async_channel::Sender<()>,
}

impl<T> OperationState<T> {
    fn complete(&mut self, status: OperationStatus, result: Option<T>, error: Option<String>) {
        if self.status != OperationStatus::Pending {
            return;
        }
        self.status = status;
        self.result = result;
        self.error = error;
        self.done.close();
    }
}

/// Handle to an in-flight or completed operation.
///
/// Clones share the same underlying operation; equality and hashing use the
/// handle id, so two clones compare equal.
pub struct OperationHandle<T> {
    id: HandleId,
    state: Rc<RefCell<OperationState<T>>>,
    closed: async_channel::Receiver<()>,
}

impl<T> OperationHandle<T> {
    fn with_state(status: OperationStatus, result: Option<T>, error: Option<String>) -> Self {
        let (done, closed) = async_channel::bounded(1);
        if status != OperationStatus::Pending {
            done.close();
        }
        Self {
            id: next_id(),
            state: Rc::new(RefCell::new(OperationState {
                status,
                result,
                error,
                done,
            })),
            closed,
        }
    }

    /// Create a pending handle together with the completer that resolves it
    #[must_use]
    pub fn pending() -> (Self, Completer<T>) {
        let handle = Self::with_state(OperationStatus::Pending, None, None);
        let completer = Completer {
            id: handle.id,
            state: Rc::clone(&handle.state),
        };
        (handle, completer)
    }

    /// Create a handle that already succeeded
    #[must_use]
    pub fn succeeded(value: T) -> Self {
        Self::with_state(OperationStatus::Succeeded, Some(value), None)
    }

    /// Create a handle that already failed
    #[must_use]
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::with_state(OperationStatus::Failed, None, Some(reason.into()))
    }

    /// Unique id of the operation, shared by every clone
    #[must_use]
    pub const fn id(&self) -> HandleId {
        self.id
    }

    /// Current progress of the operation
    #[must_use]
    pub fn status(&self) -> OperationStatus {
        self.state.borrow().status
    }

    /// Check whether the operation has finished, successfully or not
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.status() != OperationStatus::Pending
    }

    /// Failure reason reported by the backend, if any
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    /// Result of the operation. `None` while pending or after a failure.
    #[must_use]
    pub fn result(&self) -> Option<T>
    where
        T: Clone,
    {
        self.state.borrow().result.clone()
    }

    /// Future resolving to the final status once the operation completes
    #[must_use]
    pub fn completion(&self) -> Completion<T> {
        let closed = self.closed.clone();
        Completion {
            state: Rc::clone(&self.state),
            closed: Box::pin(async move {
                // Only fails once the channel is closed, which is the signal
                let _ = closed.recv().await;
            }),
        }
    }
}

impl<T> Clone for OperationHandle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            state: Rc::clone(&self.state),
            closed: self.closed.clone(),
        }
    }
}

impl<T> PartialEq for OperationHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for OperationHandle<T> {}

impl<T> Hash for OperationHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for OperationHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("OperationHandle")
            .field("id", &self.id)
            .field("status", &state.status)
            .field("error", &state.error)
            .finish()
    }
}

/// Write side of a pending operation, held by the backend.
///
/// Dropping a completer without resolving it fails the operation so that
/// awaiting callers are never left suspended forever.
pub struct Completer<T> {
    id: HandleId,
    state: Rc<RefCell<OperationState<T>>>,
}

impl<T> Completer<T> {
    /// Id of the handle this completer resolves
    #[must_use]
    pub const fn handle_id(&self) -> HandleId {
        self.id
    }

    /// Resolve the operation with a result
    pub fn succeed(self, value: T) {
        self.state
            .borrow_mut()
            .complete(OperationStatus::Succeeded, Some(value), None);
    }

    /// Resolve the operation as failed
    pub fn fail(self, reason: impl Into<String>) {
        self.state
            .borrow_mut()
            .complete(OperationStatus::Failed, None, Some(reason.into()));
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.try_borrow_mut() {
            state.complete(
                OperationStatus::Failed,
                None,
                Some(String::from("operation abandoned")),
            );
        }
    }
}

impl<T> fmt::Debug for Completer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completer").field("id", &self.id).finish()
    }
}

/// Future returned by [`OperationHandle::completion`]
pub struct Completion<T> {
    state: Rc<RefCell<OperationState<T>>>,
    closed: Pin<Box<dyn Future<Output = ()>>>,
}

impl<T> Future for Completion<T> {
    type Output = OperationStatus;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match this.closed.poll(cx) {
            Poll::Ready(()) => Poll::Ready(this.state.borrow().status),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("status", &self.state.borrow().status)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_then_succeed() {
        let (handle, completer) = OperationHandle::<u32>::pending();
        assert_eq!(handle.status(), OperationStatus::Pending);
        assert!(handle.result().is_none());

        completer.succeed(7);
        assert_eq!(handle.status(), OperationStatus::Succeeded);
        assert_eq!(handle.result(), Some(7));
    }

    #[test]
    fn test_dropped_completer_fails_operation() {
        let (handle, completer) = OperationHandle::<u32>::pending();
        drop(completer);

        assert_eq!(handle.status(), OperationStatus::Failed);
        assert_eq!(handle.error().as_deref(), Some("operation abandoned"));
    }

    #[test]
    fn test_completion_is_sticky() {
        let (handle, completer) = OperationHandle::<u32>::pending();
        completer.fail("missing");

        assert_eq!(handle.status(), OperationStatus::Failed);
        assert_eq!(pollster::block_on(handle.completion()), OperationStatus::Failed);
    }

    #[test]
    fn test_completion_future_wakes() {
        let (handle, completer) = OperationHandle::<&str>::pending();
        let mut completion = Box::pin(handle.completion());
        let mut cx = Context::from_waker(std::task::Waker::noop());

        assert!(completion.as_mut().poll(&mut cx).is_pending());
        completer.succeed("done");
        assert_eq!(
            completion.as_mut().poll(&mut cx),
            Poll::Ready(OperationStatus::Succeeded)
        );
    }

    #[test]
    fn test_clone_shares_identity() {
        let handle = OperationHandle::succeeded(1_u8);
        let clone = handle.clone();
        assert_eq!(handle, clone);
        assert_ne!(handle, OperationHandle::succeeded(1_u8));
    }

    #[test]
    fn test_asset_type_matches() {
        let asset: AssetRef = Rc::new(String::from("text"));
        assert!(AssetType::of::<String>().matches(&asset));
        assert!(!AssetType::of::<u32>().matches(&asset));
        assert!(downcast_asset::<String>(asset).is_some());
    }
}
