//! The operations layer: the fifteen shell commands, expressed as
//! compositions of the lower primitives, plus `exit`.

use crate::allocator;
use crate::config::{CLUSTER_SIZE, FORMAT_UNIT};
use crate::dir_entry::{DirectoryEntry, EntryKind};
use crate::directory;
use crate::engine::Engine;
use crate::error::FsError;
use crate::fat::{self, FatLabel};
use crate::file_io;
use crate::path;
use log::{debug, warn};
use std::fs;
use std::path::Path;

/// A fully parsed, arity-checked command. Parsing from raw tokens is a
/// two-phase validate/execute split: construction here is the validate
/// phase, [`dispatch`] is execute.
#[derive(Debug, Clone)]
pub enum Command {
    Format(u64),
    Mkdir(String),
    Rmdir(String),
    Ls(Option<String>),
    Cd(String),
    Pwd,
    Cp(String, String),
    Mv(String, String),
    Rm(String),
    Cat(String),
    Info(String),
    Incp(String, String),
    Outcp(String, String),
    Load(String),
    Defrag(String),
    Exit,
}

/// What a successful command produced, for the caller to print.
pub enum Outcome {
    /// Prints `OK`.
    Ok,
    /// Prints the given text verbatim (no trailing `OK`).
    Text(String),
    /// Writes raw bytes to stdout (`cat`), no trailing `OK`.
    Raw(Vec<u8>),
    /// The REPL should terminate.
    Exit,
}

/// Parses `name`/`args` into a [`Command`]. Returns `None` for an
/// unrecognized command name (the REPL prints its own "Unknown command"
/// message in that case); `Some(Err(InvalidOption))` for a recognized
/// command with the wrong number of arguments.
pub fn parse(name: &str, args: &[&str]) -> Option<Result<Command, FsError>> {
    let one = |args: &[&str]| -> Result<String, FsError> {
        match args {
            [a] => Ok((*a).to_string()),
            _ => Err(FsError::InvalidOption),
        }
    };
    let two = |args: &[&str]| -> Result<(String, String), FsError> {
        match args {
            [a, b] => Ok(((*a).to_string(), (*b).to_string())),
            _ => Err(FsError::InvalidOption),
        }
    };
    let none = |args: &[&str]| -> Result<(), FsError> {
        if args.is_empty() {
            Ok(())
        } else {
            Err(FsError::InvalidOption)
        }
    };

    Some(match name {
        "format" => one(args).and_then(|a| parse_format_arg(&a)).map(Command::Format),
        "mkdir" => one(args).map(Command::Mkdir),
        "rmdir" => one(args).map(Command::Rmdir),
        "ls" => match args {
            [] => Ok(Command::Ls(None)),
            [a] => Ok(Command::Ls(Some((*a).to_string()))),
            _ => Err(FsError::InvalidOption),
        },
        "cd" => one(args).map(Command::Cd),
        "pwd" => none(args).map(|()| Command::Pwd),
        "cp" => two(args).map(|(a, b)| Command::Cp(a, b)),
        "mv" => two(args).map(|(a, b)| Command::Mv(a, b)),
        "rm" => one(args).map(Command::Rm),
        "cat" => one(args).map(Command::Cat),
        "info" => one(args).map(Command::Info),
        "incp" => two(args).map(|(a, b)| Command::Incp(a, b)),
        "outcp" => two(args).map(|(a, b)| Command::Outcp(a, b)),
        "load" => one(args).map(Command::Load),
        "defrag" => one(args).map(Command::Defrag),
        "exit" => none(args).map(|()| Command::Exit),
        _ => return None,
    })
}

/// Parses a `format` argument like `2MB`. Only the `MB` unit maps to a
/// nonzero multiplier; any other trailing unit parses syntactically but
/// multiplies to zero bytes, which fails downstream as `OutOfSpace` —
/// this is spec-mandated (`format 2KB` => `CANNOT CREATE FILE`), not a
/// missing feature.
fn parse_format_arg(arg: &str) -> Result<u64, FsError> {
    let digit_end = arg
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(arg.len());
    if digit_end == 0 || digit_end == arg.len() {
        return Err(FsError::InvalidOption);
    }
    let (digits, unit) = arg.split_at(digit_end);
    let n: u64 = digits.parse().map_err(|_| FsError::InvalidOption)?;
    let multiplier = if unit.eq_ignore_ascii_case("MB") {
        FORMAT_UNIT
    } else {
        0
    };
    Ok(n * multiplier)
}

/// Executes `cmd` against `engine`.
pub fn dispatch(engine: &mut Engine, cmd: Command) -> Result<Outcome, FsError> {
    match cmd {
        Command::Format(bytes) => {
            let bytes = u32::try_from(bytes).map_err(|_| FsError::OutOfSpace)?;
            engine.format(bytes)?;
            Ok(Outcome::Ok)
        }
        Command::Mkdir(p) => mkdir(engine, &p).map(|()| Outcome::Ok),
        Command::Rmdir(p) => rmdir(engine, &p).map(|()| Outcome::Ok),
        Command::Ls(p) => ls(engine, p.as_deref()).map(Outcome::Text),
        Command::Cd(p) => cd(engine, &p).map(|()| Outcome::Ok),
        Command::Pwd => Ok(Outcome::Text(engine.pwd().to_string())),
        Command::Cp(src, dst) => cp(engine, &src, &dst).map(|()| Outcome::Ok),
        Command::Mv(src, dst) => mv(engine, &src, &dst).map(|()| Outcome::Ok),
        Command::Rm(p) => rm(engine, &p).map(|()| Outcome::Ok),
        Command::Cat(p) => cat(engine, &p).map(Outcome::Raw),
        Command::Info(p) => info(engine, &p).map(Outcome::Text),
        Command::Incp(host, fs_path) => incp(engine, Path::new(&host), &fs_path).map(|()| Outcome::Ok),
        Command::Outcp(fs_path, host) => outcp(engine, &fs_path, Path::new(&host)).map(|()| Outcome::Ok),
        Command::Load(host) => load(engine, Path::new(&host)).map(|()| Outcome::Ok),
        Command::Defrag(p) => defrag(engine, &p).map(|()| Outcome::Ok),
        Command::Exit => Ok(Outcome::Exit),
    }
}

fn mkdir(engine: &mut Engine, raw_path: &str) -> Result<(), FsError> {
    let parsed = path::split(raw_path)?;
    let cwd = engine.cwd_cluster();
    let boot = *engine.boot();
    let start = parsed.start_cluster(cwd);
    let (parent_cluster, name) =
        path::resolve_parent(engine.image(), &boot, start, &parsed.components)?;

    if directory::find_by_name(engine.image(), &boot, parent_cluster, &name, EntryKind::Any)?
        .is_some()
    {
        return Err(FsError::Exists);
    }

    let clusters = allocator::free_clusters(engine.image(), &boot, 1, false)?;
    let new_cluster = clusters[0];
    fat::write_label(engine.image(), &boot, new_cluster, FatLabel::FileEnd)?;
    directory::init(engine.image(), &boot, new_cluster, parent_cluster)?;

    let entry = DirectoryEntry::new(&name, false, 0, new_cluster)?;
    directory::insert(engine.image(), &boot, parent_cluster, &entry)?;
    engine.image().flush()?;
    debug!("mkdir {raw_path} -> cluster {new_cluster}");
    Ok(())
}

fn rmdir(engine: &mut Engine, raw_path: &str) -> Result<(), FsError> {
    let parsed = path::split(raw_path)?;
    let cwd = engine.cwd_cluster();
    let boot = *engine.boot();
    let start = parsed.start_cluster(cwd);
    let target = path::resolve(
        engine.image(),
        &boot,
        start,
        &parsed.components,
        EntryKind::Directory,
        false,
    )?;

    if directory::count(engine.image(), &boot, target.start_cluster)? != 2 {
        return Err(FsError::NotEmpty);
    }

    let (parent_cluster, name) =
        path::resolve_parent(engine.image(), &boot, start, &parsed.components)?;
    fat::write_label(engine.image(), &boot, target.start_cluster, FatLabel::Unused)?;
    directory::remove(engine.image(), &boot, parent_cluster, &name, EntryKind::Directory)?;
    debug!("rmdir {raw_path}");
    Ok(())
}

fn ls(engine: &mut Engine, raw_path: Option<&str>) -> Result<String, FsError> {
    let cwd = engine.cwd_cluster();
    let boot = *engine.boot();
    let dir_cluster = match raw_path {
        None => cwd,
        Some(p) => {
            let parsed = path::split(p)?;
            let start = parsed.start_cluster(cwd);
            path::resolve(
                engine.image(),
                &boot,
                start,
                &parsed.components,
                EntryKind::Directory,
                true,
            )?
            .start_cluster
        }
    };
    let entries = directory::enumerate(engine.image(), &boot, dir_cluster)?;
    Ok(entries
        .iter()
        .map(DirectoryEntry::name)
        .collect::<Vec<_>>()
        .join(" "))
}

fn cd(engine: &mut Engine, raw_path: &str) -> Result<(), FsError> {
    let parsed = path::split(raw_path)?;
    let cwd = engine.cwd_cluster();
    let boot = *engine.boot();
    let start = parsed.start_cluster(cwd);
    let target = path::resolve(engine.image(), &boot, start, &parsed.components, EntryKind::Any, true)?;

    if target.is_file {
        return Err(FsError::NotADirectory(
            parsed.components.last().cloned().unwrap_or_else(|| ".".to_string()),
        ));
    }

    engine.set_cwd(target.start_cluster)?;
    Ok(())
}

fn cat(engine: &mut Engine, raw_path: &str) -> Result<Vec<u8>, FsError> {
    let parsed = path::split(raw_path)?;
    let cwd = engine.cwd_cluster();
    let boot = *engine.boot();
    let start = parsed.start_cluster(cwd);
    let entry = path::resolve(engine.image(), &boot, start, &parsed.components, EntryKind::File, false)?;
    let chain = allocator::chain_from(engine.image(), &boot, entry.start_cluster, entry.size)?;
    file_io::read_file(engine.image(), &boot, &chain, entry.size as usize)
}

fn info(engine: &mut Engine, raw_path: &str) -> Result<String, FsError> {
    let parsed = path::split(raw_path)?;
    let cwd = engine.cwd_cluster();
    let boot = *engine.boot();
    let start = parsed.start_cluster(cwd);
    let entry = path::resolve(engine.image(), &boot, start, &parsed.components, EntryKind::Any, true)?;

    if entry.is_file {
        let chain = allocator::chain_from(engine.image(), &boot, entry.start_cluster, entry.size)?;
        Ok(chain.iter().map(u32::to_string).collect::<Vec<_>>().join(" "))
    } else {
        Ok(entry.to_string())
    }
}

fn incp(engine: &mut Engine, host: &Path, fs_path: &str) -> Result<(), FsError> {
    let data = fs::read(host).map_err(|_| FsError::FileNotFound)?;
    let parsed = path::split(fs_path)?;
    let cwd = engine.cwd_cluster();
    let boot = *engine.boot();
    let start = parsed.start_cluster(cwd);
    let (parent_cluster, name) =
        path::resolve_parent(engine.image(), &boot, start, &parsed.components)?;

    if directory::find_by_name(engine.image(), &boot, parent_cluster, &name, EntryKind::Any)?
        .is_some()
    {
        return Err(FsError::Exists);
    }

    write_new_file(engine, parent_cluster, &name, &data)?;
    debug!("incp {} -> {fs_path} ({} bytes)", host.display(), data.len());
    Ok(())
}

fn outcp(engine: &mut Engine, fs_path: &str, host: &Path) -> Result<(), FsError> {
    let data = cat(engine, fs_path)?;
    fs::write(host, data).map_err(FsError::ImageIoError)?;
    Ok(())
}

fn cp(engine: &mut Engine, src: &str, dst: &str) -> Result<(), FsError> {
    let data = cat(engine, src)?;
    let parsed = path::split(dst)?;
    let cwd = engine.cwd_cluster();
    let boot = *engine.boot();
    let start = parsed.start_cluster(cwd);
    let (parent_cluster, name) =
        path::resolve_parent(engine.image(), &boot, start, &parsed.components)?;

    if directory::find_by_name(engine.image(), &boot, parent_cluster, &name, EntryKind::Any)?
        .is_some()
    {
        return Err(FsError::Exists);
    }

    write_new_file(engine, parent_cluster, &name, &data)
}

fn mv(engine: &mut Engine, src: &str, dst: &str) -> Result<(), FsError> {
    let src_parsed = path::split(src)?;
    let cwd = engine.cwd_cluster();
    let boot = *engine.boot();
    let src_start = src_parsed.start_cluster(cwd);
    let entry = path::resolve(
        engine.image(),
        &boot,
        src_start,
        &src_parsed.components,
        EntryKind::File,
        false,
    )?;

    let (src_parent, src_name) =
        path::resolve_parent(engine.image(), &boot, src_start, &src_parsed.components)?;

    let dst_parsed = path::split(dst)?;
    let dst_start = dst_parsed.start_cluster(cwd);
    let (dst_parent, dst_name) =
        path::resolve_parent(engine.image(), &boot, dst_start, &dst_parsed.components)?;

    if directory::find_by_name(engine.image(), &boot, dst_parent, &dst_name, EntryKind::Any)?
        .is_some()
    {
        return Err(FsError::Exists);
    }

    let moved = DirectoryEntry::new(&dst_name, true, entry.size, entry.start_cluster)?;
    directory::insert(engine.image(), &boot, dst_parent, &moved)?;
    directory::remove(engine.image(), &boot, src_parent, &src_name, EntryKind::File)?;
    engine.image().flush()?;
    Ok(())
}

fn rm(engine: &mut Engine, raw_path: &str) -> Result<(), FsError> {
    let parsed = path::split(raw_path)?;
    let cwd = engine.cwd_cluster();
    let boot = *engine.boot();
    let start = parsed.start_cluster(cwd);
    let entry = path::resolve(engine.image(), &boot, start, &parsed.components, EntryKind::File, false)?;
    let chain = allocator::chain_from(engine.image(), &boot, entry.start_cluster, entry.size)?;

    allocator::label_chain(engine.image(), &boot, &chain, FatLabel::Unused)?;

    let (parent_cluster, name) =
        path::resolve_parent(engine.image(), &boot, start, &parsed.components)?;
    directory::remove(engine.image(), &boot, parent_cluster, &name, EntryKind::File)?;
    Ok(())
}

fn load(engine: &mut Engine, host: &Path) -> Result<(), FsError> {
    let text = fs::read_to_string(host).map_err(|_| FsError::FileNotFound)?;
    for line in text.lines() {
        let tokens: Vec<&str> = line.split_ascii_whitespace().collect();
        let Some((cmd_name, args)) = tokens.split_first() else {
            continue;
        };
        match parse(cmd_name, args) {
            None => warn!("load: unknown command: {cmd_name}"),
            Some(Err(e)) => warn!("load: {e}"),
            Some(Ok(Command::Exit)) => break,
            Some(Ok(cmd)) => {
                if let Err(e) = dispatch(engine, cmd) {
                    warn!("load: {e}");
                }
            }
        }
    }
    Ok(())
}

fn defrag(engine: &mut Engine, raw_path: &str) -> Result<(), FsError> {
    let parsed = path::split(raw_path)?;
    let cwd = engine.cwd_cluster();
    let boot = *engine.boot();
    let start = parsed.start_cluster(cwd);
    let entry = path::resolve(engine.image(), &boot, start, &parsed.components, EntryKind::File, false)?;
    let chain = allocator::chain_from(engine.image(), &boot, entry.start_cluster, entry.size)?;

    if chain.len() <= 1 || is_consecutive(&chain) {
        return Ok(());
    }

    let data = file_io::read_file(engine.image(), &boot, &chain, entry.size as usize)?;
    allocator::label_chain(engine.image(), &boot, &chain, FatLabel::Unused)?;

    let new_chain = match allocator::free_clusters(engine.image(), &boot, chain.len() as u32, true) {
        Ok(c) => c,
        Err(e) => {
            // Put the old chain back; nothing was committed to the directory.
            allocator::make_chain(engine.image(), &boot, &chain)?;
            return Err(e);
        }
    };
    allocator::make_chain(engine.image(), &boot, &new_chain)?;
    file_io::write_file(engine.image(), &boot, &new_chain, &data)?;

    let (parent_cluster, name) =
        path::resolve_parent(engine.image(), &boot, start, &parsed.components)?;
    let new_entry = DirectoryEntry::new(&name, true, entry.size, new_chain[0])?;
    directory::edit(engine.image(), &boot, parent_cluster, entry.start_cluster, &new_entry)?;
    engine.image().flush()?;
    debug!("defrag {raw_path}: {chain:?} -> {new_chain:?}");
    Ok(())
}

fn is_consecutive(chain: &[u32]) -> bool {
    chain.windows(2).all(|w| w[1] == w[0] + 1)
}

/// Shared tail of `incp`/`cp`: allocate a chain sized for `data`, link it,
/// write the bytes, then insert the directory entry — in that order, per
/// the write-before-link-before-directory-entry ordering.
fn write_new_file(
    engine: &mut Engine,
    parent_cluster: u32,
    name: &str,
    data: &[u8],
) -> Result<(), FsError> {
    let boot = *engine.boot();
    let cluster_count = data.len().div_ceil(CLUSTER_SIZE).max(1) as u32;
    let clusters = allocator::free_clusters(engine.image(), &boot, cluster_count, false)?;
    allocator::make_chain(engine.image(), &boot, &clusters)?;
    file_io::write_file(engine.image(), &boot, &clusters, data)?;

    let entry = DirectoryEntry::new(name, true, data.len() as u32, clusters[0])?;
    directory::insert(engine.image(), &boot, parent_cluster, &entry)?;
    engine.image().flush()?;
    Ok(())
}
