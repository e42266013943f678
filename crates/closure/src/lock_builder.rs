//! Converts resolved closures into a [`PackageLock`].
//!
//! Output is deterministic: the root closure first, then build closures,
//! then tool closures, each in name order, with languages and packages
//! sorted. Sub-closures with identical content are stored once under the
//! first name in that order.

use ladle_core::config::LanguageTable;
use ladle_core::lockfile::{LockedPackage, PackageLock, ROOT_CLOSURE_NAME};
use ladle_core::{Error, Result, paths};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, trace};

use crate::resolve::{ResolvedClosure, ResolvedClosures, ResolvedEntry, ResolvedReference};

/// Build the lock document for a package rooted at `working_directory`.
///
/// # Errors
///
/// Fails with an internal error if a closure name is used twice or a root
/// entry references a closure that was not resolved, and with
/// [`Error::UnknownLanguage`] for a language without configuration.
pub fn build_package_lock(
    working_directory: &Path,
    closures: &ResolvedClosures,
    languages: &LanguageTable,
) -> Result<PackageLock> {
    let mut seen_names = HashSet::new();
    let build_aliases = canonical_names(&closures.build, &mut seen_names)?;
    let tool_aliases = canonical_names(&closures.tool, &mut seen_names)?;

    let mut lock = PackageLock::new();
    lock.ensure_closure(ROOT_CLOSURE_NAME);
    add_closure(
        &mut lock,
        ROOT_CLOSURE_NAME,
        &closures.runtime,
        working_directory,
        languages,
        |entry| {
            Ok((
                rename(entry.build_closure.as_deref(), &build_aliases, "build")?,
                rename(entry.tool_closure.as_deref(), &tool_aliases, "tool")?,
            ))
        },
    )?;

    for (group, aliases) in [(&closures.build, &build_aliases), (&closures.tool, &tool_aliases)] {
        for (name, closure) in group {
            if aliases.get(name) != Some(name) {
                continue;
            }
            lock.ensure_closure(name);
            add_closure(&mut lock, name, closure, working_directory, languages, |_| {
                Ok((None, None))
            })?;
        }
    }

    lock.validate()?;
    Ok(lock)
}

/// Map every closure name to the first name (in sorted order) with the same content.
fn canonical_names(
    closures: &BTreeMap<String, ResolvedClosure>,
    seen_names: &mut HashSet<String>,
) -> Result<BTreeMap<String, String>> {
    let mut by_content: BTreeMap<&ResolvedClosure, &String> = BTreeMap::new();
    let mut aliases = BTreeMap::new();
    for (name, closure) in closures {
        if name == ROOT_CLOSURE_NAME || !seen_names.insert(name.clone()) {
            return Err(Error::internal(format!(
                "Closure name '{}' is used more than once",
                name
            )));
        }

        let canonical = *by_content.entry(closure).or_insert(name);
        if canonical != name {
            debug!(closure = %name, same_as = %canonical, "Merging identical closure");
        }
        aliases.insert(name.clone(), canonical.clone());
    }
    Ok(aliases)
}

fn rename(
    name: Option<&str>,
    aliases: &BTreeMap<String, String>,
    kind: &str,
) -> Result<Option<String>> {
    name.map(|name| {
        aliases.get(name).cloned().ok_or_else(|| {
            Error::internal(format!("Root entry references unknown {} closure '{}'", kind, name))
        })
    })
    .transpose()
}

fn add_closure(
    lock: &mut PackageLock,
    closure_name: &str,
    closure: &ResolvedClosure,
    working_directory: &Path,
    languages: &LanguageTable,
    closure_refs: impl Fn(&ResolvedEntry) -> Result<(Option<String>, Option<String>)>,
) -> Result<()> {
    for (language, packages) in closure {
        let safe_name = languages.safe_name(language)?;
        for (name, entry) in packages {
            let package = match &entry.reference {
                ResolvedReference::Version(version) => LockedPackage::public(name.clone(), *version),
                ResolvedReference::Local(path) => LockedPackage::local(
                    name.clone(),
                    paths::to_lock_path(&paths::relative_to(path, working_directory)),
                ),
            };
            let (build, tool) = closure_refs(entry)?;
            trace!(closure = closure_name, %language, %name, "Locking package");
            lock.add_package(closure_name, safe_name, package.with_closures(build, tool));
        }
    }
    Ok(())
}
