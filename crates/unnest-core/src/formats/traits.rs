//! Common traits for archive format handlers.

use std::io::Read;

use crate::Result;

/// Callback invoked once per regular-file member, with its name and content.
pub type MemberVisitor<'v> = dyn FnMut(&str, &mut dyn Read) -> Result<()> + 'v;

/// Trait for container formats that hold named members.
///
/// Implementations walk members in the order the underlying reader yields
/// them. Directories, links and other entries without content are skipped.
/// An error returned by the visitor stops the walk and is returned as-is.
pub trait ContainerFormat {
    /// Visits every regular-file member in archive order.
    ///
    /// # Errors
    ///
    /// Returns an error if the container is corrupt or the visitor fails.
    fn walk(&mut self, visit: &mut MemberVisitor<'_>) -> Result<()>;

    /// Returns the archive format name.
    fn format_name(&self) -> &'static str;
}
