//! # OperandBindInfo Controller
//!
//! A Kubernetes controller that copies the Secrets and ConfigMaps published
//! by an operand into the namespaces of the OperandRequests that asked for it.
//!
//! ## Overview
//!
//! 1. **Watching OperandBindInfos** - plus the Secrets and ConfigMaps they own
//! 2. **Resolving consumers** - the registry status lists every requesting namespace
//! 3. **Copying bindings** - public bindings are replicated under the requested names
//! 4. **Tracking phase** - `Initialized`, `Completed` or `Failed` on the status
//!
//! Configuration comes from environment variables, see
//! [`operand_bindinfo_controller::config::ControllerConfig`].

use anyhow::Result;
use operand_bindinfo_controller::runtime::initialization::initialize;
use operand_bindinfo_controller::runtime::watch_loop::run_watch_loop;

#[tokio::main]
async fn main() -> Result<()> {
    let init_result = initialize().await?;

    run_watch_loop(
        init_result.apis,
        init_result.context,
        init_result.server_state,
    )
    .await
}
