// SPDX-License-Identifier: MIT

//! Translates a job's manifest [`Value`] tree into the [`ChildSetup`] the
//! launcher needs: argv, environment, and every identity/resource
//! attribute spec.md §3 lists under "keys of interest".

use std::ffi::CString;
use std::os::fd::RawFd;

use warden_core::job::Job;
use warden_core::value::{Mapping, Value};
use warden_core::ErrorKind;

use crate::launcher::ChildSetup;
use crate::rlimit::RlimitKind;

fn cstring(s: &str) -> Result<CString, ErrorKind> {
    CString::new(s).map_err(|_| ErrorKind::invalid("value contains an interior NUL byte"))
}

fn env_pairs(map: &Mapping, key: &str) -> Vec<(String, String)> {
    let Some(env) = map.get(key).and_then(Value::as_map) else {
        return Vec::new();
    };
    env.iter()
        .filter_map(|(k, v)| v.as_str().map(|v| (k.to_string(), v.to_string())))
        .collect()
}

fn rlimit_entries(map: &Mapping) -> Vec<(RlimitKind, u64, u64)> {
    let soft = map.get("soft-resource-limits").and_then(Value::as_map);
    let hard = map.get("hard-resource-limits").and_then(Value::as_map);
    let Some(soft) = soft else { return Vec::new() };

    soft.iter()
        .filter_map(|(key, value)| {
            let kind = RlimitKind::from_manifest_key(key)?;
            let soft_val = value.as_int()? as u64;
            let hard_val = hard
                .and_then(|h| h.get(key))
                .and_then(Value::as_int)
                .map(|v| v as u64)
                .unwrap_or(soft_val);
            Some((kind, soft_val, hard_val))
        })
        .collect()
}

/// Builds the full child-launch description for `job`. `inherited_fds`
/// are the socket-activation descriptors already opened by
/// `ActivationTable::arm`, to be left open (cloexec cleared) in the
/// child. `base_env` is the supervisor's own user-environment mirror
/// (`set-user-env`/`get-user-env`); the job's own `environment-variables`
/// mapping overrides it key-for-key.
pub fn build_child_setup(
    job: &Job,
    inherited_fds: Vec<RawFd>,
    base_env: &[(String, String)],
) -> Result<ChildSetup, ErrorKind> {
    let map = job
        .manifest
        .as_map()
        .ok_or_else(|| ErrorKind::invalid("manifest is not a mapping"))?;

    let program = map
        .get("program")
        .and_then(Value::as_str)
        .ok_or_else(|| ErrorKind::invalid("missing program"))?;
    let mut argv: Vec<String> = map
        .get("program-arguments")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();
    if argv.is_empty() {
        argv.push(program.to_string());
    }

    let mut merged: Vec<(String, String)> = base_env.to_vec();
    for (k, v) in env_pairs(map, "environment-variables") {
        if let Some(slot) = merged.iter_mut().find(|(mk, _)| *mk == k) {
            slot.1 = v;
        } else {
            merged.push((k, v));
        }
    }
    let mut envp: Vec<String> = merged.into_iter().map(|(k, v)| format!("{k}={v}")).collect();
    if !envp.iter().any(|kv| kv.starts_with("PATH=")) {
        envp.push("PATH=/usr/bin:/bin:/usr/sbin:/sbin".to_string());
    }

    let working_directory = map
        .get("working-directory")
        .and_then(Value::as_str)
        .map(cstring)
        .transpose()?;
    let root_directory = map
        .get("root-directory")
        .and_then(Value::as_str)
        .map(cstring)
        .transpose()?;

    let uid = map
        .get("user-name")
        .and_then(Value::as_str)
        .and_then(|name| nix::unistd::User::from_name(name).ok().flatten())
        .map(|u| u.uid);
    let gid = map
        .get("group-name")
        .and_then(Value::as_str)
        .and_then(|name| nix::unistd::Group::from_name(name).ok().flatten())
        .map(|g| g.gid);

    let umask = map.get("umask").and_then(Value::as_int).map(|v| v as u32);
    let nice = map.get("nice").and_then(Value::as_int).map(|v| v as i32);

    let stdout_path = map.get("stdout-path").and_then(Value::as_str).map(cstring).transpose()?;
    let stderr_path = map.get("stderr-path").and_then(Value::as_str).map(cstring).transpose()?;

    Ok(ChildSetup {
        program: cstring(program)?,
        argv: argv
            .iter()
            .map(|s| cstring(s))
            .collect::<Result<Vec<_>, _>>()?,
        envp: envp.iter().map(|s| cstring(s)).collect::<Result<Vec<_>, _>>()?,
        working_directory,
        root_directory,
        uid,
        gid,
        init_groups: map.get("init-groups").and_then(Value::as_bool).unwrap_or(false),
        session_create: map.get("session-create").and_then(Value::as_bool).unwrap_or(false),
        umask,
        low_priority_io: map.get("low-priority-io").and_then(Value::as_bool).unwrap_or(false),
        nice,
        stdout_path,
        stderr_path,
        rlimits: rlimit_entries(map),
        inherited_fds,
    })
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
