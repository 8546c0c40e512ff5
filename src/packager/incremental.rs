//! Incremental ("only changed") filtering
//!
//! The check is a heuristic: an existing archive file counts as up to date.
//! A changed source that bundles to the same filename is not detected; delete
//! the archive (or run without `--only-changed`) to force repackaging.

use tracing::debug;

use super::descriptor::ScriptDescriptor;
use super::events::{Events, PackageEvent};

/// Drop scripts whose archive already exists on disk.
///
/// With `only_changed == false` the input is returned untouched and no events
/// are emitted. Otherwise every script whose `zip_file` exists is reported
/// through an `ignore-package` event and removed; the rest come back with
/// `zip_file` cleared. Existing archives are never touched.
#[must_use]
pub fn filter_changed(
    descriptors: Vec<ScriptDescriptor>,
    only_changed: bool,
    events: &Events,
) -> Vec<ScriptDescriptor> {
    if !only_changed {
        return descriptors;
    }

    descriptors
        .into_iter()
        .filter_map(|descriptor| {
            let up_to_date = descriptor
                .zip_file
                .as_deref()
                .is_some_and(std::path::Path::exists);
            if up_to_date {
                debug!(script = %descriptor.name, "archive exists, skipping");
                events.emit(&PackageEvent::IgnorePackage(descriptor));
                None
            } else {
                Some(descriptor.with_zip_file(None))
            }
        })
        .collect()
}
