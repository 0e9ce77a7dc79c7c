//! 外部命令后端
//!
//! 参数中的占位符会被替换：`%header%`、`%text%`、`%event%`、`%category%`。

use crate::coordinator::EntitySink;
use crate::entity::{keys, Entity};
use crate::notification::backend::PresentationBackend;
use crate::notification::rule::{Method, MethodParams, NotificationRule};
use anyhow::{Context, Result};
use std::any::Any;
use std::path::PathBuf;
use std::io;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// 一次待执行的命令调用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

/// 按 Entity 内容展开参数
pub fn build_invocation(program: &str, args: &[String], entity: &Entity) -> Invocation {
    let header = entity.get_str(keys::HEADER).unwrap_or_default();
    let text = entity
        .get_str(keys::TEXT)
        .or_else(|| entity.get_str(keys::FULL_TEXT))
        .unwrap_or_default();

    let args = args
        .iter()
        .map(|arg| {
            arg.replace("%header%", header)
                .replace("%text%", text)
                .replace("%event%", entity.event_id())
                .replace("%category%", entity.event_category())
        })
        .collect();

    Invocation {
        program: program.to_string(),
        args,
    }
}

#[derive(Debug, Default)]
pub struct CommandBackend {
    launched: u64,
}

impl CommandBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launched(&self) -> u64 {
        self.launched
    }

    /// 启动命令，子进程由单独的线程回收
    fn spawn(&self, invocation: &Invocation) -> Result<JoinHandle<io::Result<ExitStatus>>> {
        let program: PathBuf = which::which(&invocation.program)
            .with_context(|| format!("command not found: {}", invocation.program))?;

        let mut child = Command::new(&program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to spawn {}", program.display()))?;

        let name = invocation.program.clone();
        let waiter = thread::Builder::new()
            .name(format!("reap-{}", name))
            .spawn(move || {
                let status = child.wait();
                match &status {
                    Ok(status) => debug!(program = %name, status = %status, "Command exited"),
                    Err(e) => warn!(program = %name, error = %e, "Failed to wait for command"),
                }
                status
            })
            .context("failed to start command waiter")?;

        Ok(waiter)
    }
}

impl PresentationBackend for CommandBackend {
    fn method(&self) -> Method {
        Method::Command
    }

    fn handle(&mut self, entity: &Entity, rule: &NotificationRule, _sink: &EntitySink) {
        if entity.is_cancel() {
            return;
        }

        let Some(MethodParams::Command { program, args }) = rule.params(Method::Command) else {
            debug!(rule = %rule.name, "Command rule without program");
            return;
        };

        let invocation = build_invocation(program, args, entity);
        match self.spawn(&invocation) {
            Ok(_waiter) => {
                self.launched += 1;
                info!(program = %invocation.program, event_id = entity.event_id(), "Command launched");
            }
            Err(e) => warn!(rule = %rule.name, error = %e, "Failed to launch command"),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
