//! Safety capability port: the hardware-abstraction source of the nine-signal
//! interlock snapshot.

use crate::error::EngineResult;
use crate::model::interlock::InterlockStatus;
use async_trait::async_trait;

#[async_trait]
pub trait SafetyPort: Send + Sync {
    /// Atomic snapshot of all nine interlock signals in a single call, so that no
    /// signal is read at a different instant than the others. Callers are
    /// responsible for applying the 10ms timeout (see
    /// [`crate::safety::interlocks::InterlockChain`]); this method itself should
    /// return as soon as the underlying hardware answers.
    async fn check_all_interlocks(&self) -> EngineResult<InterlockStatus>;

    /// Commands the generator/detector into a safe standby state. Called whenever
    /// the engine forces a critical-hardware shutdown or on crash recovery, before
    /// any option is presented to the operator.
    async fn emergency_standby(&self) -> EngineResult<()>;

    /// Registers a callback invoked when the hardware reports an asynchronous
    /// interlock change. Adapters must translate the callback into a
    /// [`crate::model::transition::TransitionRequest`] posted onto the executor's
    /// channel — never apply it directly on the callback thread.
    fn register_interlock_callback(&self, callback: Box<dyn Fn(InterlockStatus) + Send + Sync>);
}
