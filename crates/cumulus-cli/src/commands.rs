//! Subcommand implementations
//!
//! Listings and file contents go to stdout; progress and summaries are
//! logged to stderr.

use anyhow::{Context, Result};
use cumulus_cloud::CloudStore;
use cumulus_core::config::Config;
use cumulus_core::key::{clean_key, directory_prefix, has_magic, parent_and_name, SEPARATOR};
use cumulus_core::utils::{format_size, total_size, usage_by_child};
use cumulus_core::{Group, GroupKind, KeyBackend, ObjectBackend, ObjectInfo, PathResolver, VirtualTree};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// List like a shell `ls`
pub fn ls(store: &CloudStore, pattern: &str) -> Result<()> {
    let entries = PathResolver::new(store).ls(pattern)?;
    let mut out = io::stdout().lock();
    for entry in &entries {
        writeln!(out, "{}", entry)?;
    }
    Ok(())
}

/// Print every key matching a pattern
pub fn glob(store: &CloudStore, pattern: &str, long: bool, json: bool) -> Result<()> {
    let resolver = PathResolver::new(store);
    let mut out = io::stdout().lock();

    if !long && !json {
        for key in resolver.resolve(pattern)? {
            writeln!(out, "{}", key)?;
        }
        return Ok(());
    }

    let objects = resolver.search(pattern)?;
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&objects)?)?;
    } else {
        for object in &objects {
            writeln!(out, "{}", long_line(object))?;
        }
    }

    info!(
        "{} objects, {} total",
        objects.len(),
        format_size(total_size(&objects))
    );
    Ok(())
}

fn long_line(object: &ObjectInfo) -> String {
    let modified = object
        .last_modified
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!("{:>10}  {:<19}  {}", format_size(object.size), modified, object.key)
}

/// Print the simulated directory tree below `path`
pub fn tree(store: &CloudStore, config: &Config, path: &str, depth: Option<usize>) -> Result<()> {
    let tree = VirtualTree::build_with_options(path, store, config.tree_options())?;
    let root = tree.root();

    let mut out = io::stdout().lock();
    writeln!(out, "{}", root)?;
    print_group(&mut out, root, 1, depth)
}

fn print_group<B: KeyBackend>(
    out: &mut impl Write,
    group: Group<'_, B>,
    level: usize,
    max_depth: Option<usize>,
) -> Result<()> {
    if max_depth.is_some_and(|max| level > max) {
        return Ok(());
    }

    let listing = group.expand()?;
    let indent = "  ".repeat(level);

    for name in &listing.groups {
        let child = group.group(name)?;
        match child.kind() {
            GroupKind::Container => writeln!(out, "{}{}/ [group]", indent, name)?,
            _ => writeln!(out, "{}{}/", indent, name)?,
        }
        print_group(out, child, level + 1, max_depth)?;
    }
    for name in &listing.datasets {
        writeln!(out, "{}{}", indent, name)?;
    }
    Ok(())
}

/// Show metadata for one key, or a summary for a directory
pub fn stat(store: &CloudStore, key: &str) -> Result<()> {
    let key = clean_key(key);
    let mut out = io::stdout().lock();

    match store.object_info(&key) {
        Ok(info) => {
            writeln!(out, "key:      {}", info.key)?;
            writeln!(out, "size:     {} ({} bytes)", format_size(info.size), info.size)?;
            if let Some(modified) = info.last_modified {
                writeln!(out, "modified: {}", modified.format("%Y-%m-%d %H:%M:%S UTC"))?;
            }
        }
        Err(e) if e.is_not_found() => {
            let prefix = directory_prefix(&key);
            let keys = store.list_keys(&prefix)?;
            if prefix.is_empty() || keys.is_empty() {
                return Err(e.into());
            }
            writeln!(out, "key:      {}", prefix)?;
            writeln!(out, "type:     directory")?;
            writeln!(out, "objects:  {}", keys.len())?;
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// Write an object to stdout
pub fn cat(store: &CloudStore, key: &str) -> Result<()> {
    let mut reader = store.reader(&clean_key(key))?;
    let mut out = io::stdout().lock();
    io::copy(&mut reader, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Download an object to a local file
///
/// With `recursive`, a directory is mirrored below the output directory
/// (by default one named after the directory).
pub fn get(store: &CloudStore, key: &str, output: Option<PathBuf>, recursive: bool) -> Result<()> {
    let key = clean_key(key);
    let name = parent_and_name(&key).1.to_string();

    if recursive && (key.is_empty() || key.ends_with(SEPARATOR) || !store.key_exists(&key)?) {
        let default_dir = if name.is_empty() { "." } else { name.as_str() };
        let target = output.unwrap_or_else(|| PathBuf::from(default_dir));
        return download_directory(store, &key, &target);
    }

    let target = match output {
        Some(path) if path.is_dir() => path.join(&name),
        Some(path) => path,
        None => PathBuf::from(&name),
    };

    let mut reader = store.reader(&key)?;
    let mut file = File::create(&target)
        .with_context(|| format!("Failed to create {}", target.display()))?;
    let copied = io::copy(&mut reader, &mut file)?;

    info!(
        "Downloaded {} ({}) to {}",
        key,
        format_size(copied),
        target.display()
    );
    Ok(())
}

fn download_directory(store: &CloudStore, key: &str, target: &Path) -> Result<()> {
    let prefix = directory_prefix(key);
    let objects = store.list_objects(&prefix)?;
    if objects.is_empty() {
        return Err(cumulus_core::Error::NotFound(prefix).into());
    }

    for object in &objects {
        let relative = &object.key[prefix.len()..];
        let path = relative
            .split(SEPARATOR)
            .filter(|s| !matches!(*s, "" | "." | ".."))
            .fold(target.to_path_buf(), |path, segment| path.join(segment));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        debug!("Downloading {} to {}", object.key, path.display());
        let mut reader = store.reader(&object.key)?;
        let mut file = File::create(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        io::copy(&mut reader, &mut file)?;
    }

    info!(
        "Downloaded {} objects ({}) to {}",
        objects.len(),
        format_size(total_size(&objects)),
        target.display()
    );
    Ok(())
}

/// Upload a local file
///
/// A key ending in `/` (or an empty key) receives the file's own name.
pub fn put(store: &CloudStore, file: &Path, key: &str) -> Result<()> {
    let mut key = clean_key(key);
    if key.is_empty() || key.ends_with(SEPARATOR) {
        let name = file
            .file_name()
            .with_context(|| format!("{} has no file name", file.display()))?;
        key.push_str(&name.to_string_lossy());
    }

    let mut source =
        File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let mut writer = store.writer(&key)?;
    let copied = io::copy(&mut source, &mut writer)?;
    let multipart = writer.is_multipart();
    writer.finalize()?;

    info!(
        "Uploaded {} ({}{}) to {}",
        file.display(),
        format_size(copied),
        if multipart { ", multipart" } else { "" },
        key
    );
    Ok(())
}

/// Delete a key, or with `recursive` everything under a directory or pattern
pub fn rm(store: &CloudStore, pattern: &str, recursive: bool) -> Result<()> {
    let targets = removal_targets(store, pattern, recursive)?;

    for key in &targets {
        debug!("Removing {}", key);
        store.delete_object(key)?;
    }
    info!("Removed {} objects", targets.len());
    Ok(())
}

/// Keys to delete, checked in full before anything is removed
fn removal_targets(store: &CloudStore, pattern: &str, recursive: bool) -> Result<Vec<String>> {
    let cleaned = clean_key(pattern);

    if !has_magic(&cleaned) {
        if !cleaned.is_empty() && !cleaned.ends_with(SEPARATOR) && store.key_exists(&cleaned)? {
            return Ok(vec![cleaned]);
        }
        let prefix = directory_prefix(&cleaned);
        let keys = store.list_keys(&prefix)?;
        if keys.is_empty() {
            return Err(cumulus_core::Error::NotFound(cleaned).into());
        }
        if !recursive {
            anyhow::bail!("'{}' is a directory; use -r to remove it", prefix);
        }
        return Ok(keys);
    }

    let entries = PathResolver::new(store).ls(&cleaned)?;
    if entries.is_empty() {
        return Err(cumulus_core::Error::NotFound(cleaned).into());
    }

    let mut keys = Vec::new();
    for entry in entries {
        if entry.ends_with(SEPARATOR) {
            if !recursive {
                anyhow::bail!("'{}' is a directory; use -r to remove it", entry);
            }
            keys.extend(store.list_keys(&entry)?);
        } else {
            keys.push(entry);
        }
    }
    Ok(keys)
}

/// Copy or move a key, or with `recursive` every key under a directory
///
/// A destination ending in `/` receives the source's name. Existing keys
/// are only replaced with `force`; every destination is checked before
/// anything is written.
pub fn transfer(
    store: &CloudStore,
    source: &str,
    destination: &str,
    recursive: bool,
    force: bool,
    remove_source: bool,
) -> Result<()> {
    let pairs = transfer_pairs(store, source, destination, recursive)?;

    if !force {
        for (_, to) in &pairs {
            if store.key_exists(to)? {
                return Err(cumulus_core::Error::AlreadyExists(to.clone()).into());
            }
        }
    }

    for (from, to) in &pairs {
        if remove_source {
            debug!("Moving {} to {}", from, to);
            store.rename_object(from, to, force)?;
        } else {
            debug!("Copying {} to {}", from, to);
            store.copy_object(from, to, force)?;
        }
    }

    info!(
        "{} {} objects",
        if remove_source { "Moved" } else { "Copied" },
        pairs.len()
    );
    Ok(())
}

fn transfer_pairs(
    store: &CloudStore,
    source: &str,
    destination: &str,
    recursive: bool,
) -> Result<Vec<(String, String)>> {
    let source = clean_key(source);
    let destination = clean_key(destination);
    if has_magic(&source) {
        anyhow::bail!("'{}' is a pattern; copy and move take a single key or directory", source);
    }

    if !source.is_empty() && !source.ends_with(SEPARATOR) && store.key_exists(&source)? {
        let to = if destination.is_empty() || destination.ends_with(SEPARATOR) {
            format!("{}{}", destination, parent_and_name(&source).1)
        } else {
            destination
        };
        return Ok(vec![(source, to)]);
    }

    let prefix = directory_prefix(&source);
    let keys = store.list_keys(&prefix)?;
    if keys.is_empty() {
        return Err(cumulus_core::Error::NotFound(source).into());
    }
    if !recursive {
        anyhow::bail!("'{}' is a directory; use -r to copy it", prefix);
    }

    let target = directory_prefix(&destination);
    Ok(keys
        .into_iter()
        .map(|key| {
            let to = format!("{}{}", target, &key[prefix.len()..]);
            (key, to)
        })
        .collect())
}

/// Show the space used below a directory
///
/// Prints one line per immediate child unless `summarize` is set, then the
/// total.
pub fn du(store: &CloudStore, path: &str, summarize: bool) -> Result<()> {
    let key = clean_key(path);
    let mut out = io::stdout().lock();

    if !key.is_empty() && !key.ends_with(SEPARATOR) && store.key_exists(&key)? {
        let info = store.object_info(&key)?;
        writeln!(out, "{}", usage_line(info.size, 1, &info.key))?;
        return Ok(());
    }

    let prefix = directory_prefix(&key);
    let objects = store.list_objects(&prefix)?;
    if objects.is_empty() && !prefix.is_empty() {
        return Err(cumulus_core::Error::NotFound(key).into());
    }

    if !summarize {
        for usage in usage_by_child(&prefix, &objects) {
            writeln!(out, "{}", usage_line(usage.size, usage.objects, &usage.path))?;
        }
    }
    let label = if prefix.is_empty() { "/" } else { prefix.as_str() };
    writeln!(
        out,
        "{}",
        usage_line(total_size(&objects), objects.len(), label)
    )?;
    Ok(())
}

fn usage_line(size: u64, objects: usize, path: &str) -> String {
    format!("{:>10}  {:>6}  {}", format_size(size), objects, path)
}
