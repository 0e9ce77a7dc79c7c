//! 规则存储 - 注册、替换与规则文件加载
//!
//! 运行时只能通过 `x-app/notification-rule-create` Entity 增改规则；
//! 启动时可以从 JSON 规则文件加载一批规则。

use super::rule::{FieldMatch, FieldMatcher, Method, MethodParams, NotificationRule, RuleDefinition};
use crate::entity::{keys, mime, Entity, Variant};
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// 规则存储
#[derive(Debug, Default)]
pub struct RuleStore {
    /// 按注册顺序保存
    rules: Vec<NotificationRule>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册规则：校验失败时返回错误且规则集不变；同名规则原位替换
    pub fn register(&mut self, rule: NotificationRule) -> Result<()> {
        if let Err(e) = rule.validate() {
            warn!(rule = %rule.name, error = %e, "Rejecting malformed notification rule");
            return Err(e);
        }

        match self.rules.iter_mut().find(|r| r.name == rule.name) {
            Some(existing) => {
                info!(rule = %rule.name, "Replacing notification rule");
                *existing = rule;
            }
            None => {
                info!(rule = %rule.name, category = %rule.category, event_type = %rule.event_type, "Registering notification rule");
                self.rules.push(rule);
            }
        }
        Ok(())
    }

    /// 处理规则创建 Entity
    pub fn handle_entity(&mut self, entity: &Entity) -> Result<()> {
        let rule = rule_from_entity(entity)?;
        self.register(rule)
    }

    /// 从 JSON 规则文件加载，返回成功注册的数量
    ///
    /// 单条规则无效时跳过并记录日志，文件本身无法解析时返回错误。
    pub fn load_file(&mut self, path: &Path) -> Result<usize> {
        let definitions = read_rules_file(path)?;

        let mut loaded = 0;
        for def in definitions {
            let name = def.name.clone();
            match NotificationRule::try_from(def).and_then(|rule| self.register(rule)) {
                Ok(()) => loaded += 1,
                Err(e) => warn!(rule = %name, error = %e, "Skipping invalid rule in rules file"),
            }
        }
        info!(path = %path.display(), loaded, "Loaded notification rules");
        Ok(loaded)
    }

    pub fn rules(&self) -> &[NotificationRule] {
        &self.rules
    }

    pub(crate) fn rules_mut(&mut self) -> &mut [NotificationRule] {
        &mut self.rules
    }

    pub fn get(&self, name: &str) -> Option<&NotificationRule> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn definitions(&self) -> Vec<RuleDefinition> {
        self.rules.iter().map(RuleDefinition::from).collect()
    }
}

/// 读取规则文件（JSON 数组）
pub fn read_rules_file(path: &Path) -> Result<Vec<RuleDefinition>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read rules file {}", path.display()))?;
    let definitions: Vec<RuleDefinition> = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse rules file {}", path.display()))?;
    Ok(definitions)
}

/// 从规则创建 Entity 解析规则
pub fn rule_from_entity(entity: &Entity) -> Result<NotificationRule> {
    if entity.mime() != mime::RULE_CREATE {
        bail!("entity {} is not a rule creation request", entity.mime());
    }

    let category = entity.event_category().to_string();
    let event_type = entity.event_type().to_string();
    let name = entity
        .get_str(keys::RULE_NAME)
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}:{}", category, event_type));

    let mut rule = NotificationRule::new(name, category, event_type)
        .single_shot(entity.get_bool(keys::RULE_SINGLE_SHOT).unwrap_or(false));

    for method_name in entity.get_string_list(keys::RULE_METHODS) {
        let method: Method = method_name.parse()?;
        rule.methods |= method.as_set();
    }

    if let Some(file) = entity.get_str(keys::RULE_AUDIO_FILE) {
        rule = rule.with_params(Method::Audio, MethodParams::Audio { file: file.into() });
    }

    if let Some(program) = entity.get_str(keys::RULE_COMMAND) {
        rule = rule.with_params(
            Method::Command,
            MethodParams::Command {
                program: program.to_string(),
                args: entity.get_string_list(keys::RULE_COMMAND_ARGS),
            },
        );
    }

    if let Some(Variant::Json(value)) = entity.get(keys::RULE_FIELD_MATCHES) {
        let definitions: Vec<FieldMatch> = serde_json::from_value(value.clone())
            .context("invalid field matches in rule creation entity")?;
        for def in definitions {
            rule = rule.with_field_match(FieldMatcher::compile(def)?);
        }
    }

    Ok(rule)
}
