//! Motion command trait
//!
//! Every named cursor motion implements `Motion`. The session looks motions
//! up by name and supplies the ambient state explicitly:
//!
//! - **surface**: the active surface to move on
//! - **in_mark_mode**: whether the motion extends the region
//! - **prefix**: the prefix argument taken for this invocation (`None` if absent)
//!
//! Motions never read or reset the prefix argument themselves.

use async_trait::async_trait;

use crate::core::surface::Surface;
use crate::error::Result;

#[async_trait(?Send)]
pub trait Motion {
    /// Move every cursor on `surface`
    async fn run(&self, surface: &dyn Surface, in_mark_mode: bool, prefix: Option<i64>)
    -> Result<()>;
}
