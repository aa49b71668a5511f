//! Purpose: Hold top-level CLI command dispatch for `jsonus`.
//! Exports: `dispatch_command`.
//! Role: Keep `main.rs` focused on parse/bootstrap and delegate command execution.
//! Invariants: Each command runs on a fresh `Extension`; its handles are released with it.
//! Invariants: Editing commands write back only after the native call succeeds.

use super::*;

use std::fs::OpenOptions;

use clap::CommandFactory;
use fs2::FileExt;
use jsonus::api::{Extension, Handle};

pub(super) fn dispatch_command(
    command: Command,
    config: Config,
    color_mode: ColorMode,
) -> Result<RunOutcome, Error> {
    let mut ext = Extension::new(config);
    match command {
        Command::Completion { shell } => {
            let mut cmd = Cli::command();
            clap_complete::aot::generate(shell, &mut cmd, "jsonus", &mut io::stdout());
            Ok(RunOutcome::ok())
        }
        Command::Print { file, indent } => {
            let handle = ext.from_file(&file)?;
            let value = ext.document(handle)?.value().clone();
            emit_json(&value, indent, color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Type { file } => {
            let handle = ext.from_file(&file)?;
            let kind = ext.get_type(handle)?;
            emit_json(&json!({ "type": kind, "code": kind.code() }), -1, color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Size { file } => {
            let handle = ext.from_file(&file)?;
            let size = ext.size(handle)?;
            emit_json(&json!({ "size": size }), -1, color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Keys { file } => {
            let handle = ext.from_file(&file)?;
            let keys = ext.document(handle)?.keys().collect::<Vec<_>>();
            emit_json(&json!({ "keys": keys }), -1, color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Has { file, key } => {
            let handle = ext.from_file(&file)?;
            let present = ext.has_key(handle, &key)?;
            emit_json(&json!({ "key": key, "present": present }), -1, color_mode);
            Ok(RunOutcome::ok())
        }
        Command::Get {
            file,
            key,
            kind,
            indent,
        } => {
            let handle = ext.from_file(&file)?;
            let value = read_value(&mut ext, handle, &key, kind)?;
            match value {
                Value::String(text) if kind == ValueKind::String => println!("{text}"),
                value => emit_json(&value, indent, color_mode),
            }
            Ok(RunOutcome::ok())
        }
        Command::Set {
            file,
            key,
            value,
            kind,
            upsert,
            indent,
        } => {
            let verified = edit_file(&mut ext, &file, indent, |ext, handle| {
                write_value(ext, handle, &key, &value, kind, upsert)
            })?;
            emit_json(&json!({ "key": key, "verified": verified }), -1, color_mode);
            if verified {
                Ok(RunOutcome::ok())
            } else {
                Ok(RunOutcome::with_code(to_exit_code(ErrorKind::Internal)))
            }
        }
        Command::Remove { file, key, indent } => {
            edit_file(&mut ext, &file, indent, |ext, handle| {
                ext.remove(handle, &key)
            })?;
            Ok(RunOutcome::ok())
        }
        Command::Clear { file, indent } => {
            edit_file(&mut ext, &file, indent, |ext, handle| ext.clear(handle))?;
            Ok(RunOutcome::ok())
        }
    }
}

fn read_value(
    ext: &mut Extension,
    handle: Handle,
    key: &str,
    kind: ValueKind,
) -> Result<Value, Error> {
    let value = match kind {
        ValueKind::Json => {
            let child = ext.get(handle, key)?;
            let value = ext.document(child)?.value().clone();
            ext.close(child)?;
            value
        }
        ValueKind::String => json!(ext.get_string(handle, key)?),
        ValueKind::Int => json!(ext.get_int(handle, key)?),
        ValueKind::Int64 => json!(ext.get_int64(handle, key)?),
        ValueKind::Float => json!(ext.get_float(handle, key)?),
        ValueKind::Bool => json!(ext.get_bool(handle, key)?),
        ValueKind::Null => json!(ext.is_null(handle, key)?),
    };
    Ok(value)
}

fn write_value(
    ext: &mut Extension,
    handle: Handle,
    key: &str,
    raw: &str,
    kind: ValueKind,
    upsert: bool,
) -> Result<bool, Error> {
    if upsert {
        let text = match kind {
            ValueKind::Json => raw.to_string(),
            ValueKind::String => json!(raw).to_string(),
            ValueKind::Int => json!(parse_arg::<i32>(raw, "int")?).to_string(),
            ValueKind::Int64 => json!(parse_arg::<i64>(raw, "int64")?).to_string(),
            ValueKind::Float => return ext.write_float(handle, key, parse_arg(raw, "float")?),
            ValueKind::Bool => json!(parse_arg::<bool>(raw, "bool")?).to_string(),
            ValueKind::Null => "null".to_string(),
        };
        return ext.write(handle, key, &text);
    }
    match kind {
        ValueKind::String => ext.set_string(handle, key, raw),
        ValueKind::Int => ext.set_int(handle, key, parse_arg(raw, "int")?),
        ValueKind::Int64 => ext.set_int64(handle, key, parse_arg(raw, "int64")?),
        ValueKind::Float => ext.set_float(handle, key, parse_arg(raw, "float")?),
        ValueKind::Bool => ext.set_bool(handle, key, parse_arg(raw, "bool")?),
        ValueKind::Json | ValueKind::Null => {
            if !ext.has_key(handle, key)? {
                return Err(Error::new(ErrorKind::Key)
                    .with_message(format!("key '{key}' not found (use --upsert to create it)"))
                    .with_key(key));
            }
            let text = if kind == ValueKind::Null { "null" } else { raw };
            ext.write(handle, key, text)
        }
    }
}

fn parse_arg<T: std::str::FromStr>(raw: &str, label: &str) -> Result<T, Error> {
    raw.parse().map_err(|_| {
        Error::new(ErrorKind::Usage).with_message(format!("'{raw}' is not a valid {label}"))
    })
}

/// Loads `file` under an exclusive lock, applies `f`, and writes the result back.
fn edit_file<T>(
    ext: &mut Extension,
    file: &str,
    indent: i32,
    f: impl FnOnce(&mut Extension, Handle) -> Result<T, Error>,
) -> Result<T, Error> {
    let path = ext.config().resolve(file);
    let lock_file = OpenOptions::new().read(true).open(&path).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("cannot open file")
            .with_path(&path)
            .with_source(err)
    })?;
    FileExt::lock_exclusive(&lock_file).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to lock file")
            .with_path(&path)
            .with_source(err)
    })?;

    let handle = ext.from_file(file)?;
    let out = f(ext, handle)?;
    ext.to_file(handle, file, indent)?;
    ext.close(handle)?;

    // Dropping the descriptor releases the lock even if unlock fails.
    let _ = FileExt::unlock(&lock_file);
    Ok(out)
}
