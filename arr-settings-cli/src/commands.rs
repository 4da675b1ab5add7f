//! Command handlers

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Result, bail};
use arr_settings_api::{AppType, Collection};
use arr_settings_core::CoreResult;
use arr_settings_core::services::{
    CollectionService, ConnectionProber, EditorNavigator, InstanceService, InstanceSwitcher,
    ServiceContext, SettingsPage, SwitchOutcome,
};
use arr_settings_core::types::{AppSettings, Form, InstanceConfig};
use serde_json::Value;

use crate::terminal::StdinConfirmer;

/// `key=value` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub key: String,
    pub value: String,
}

impl FromStr for Assignment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("missing field name in '{s}'"));
        }
        Ok(Self {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// Something with an editable form.
trait FieldInput {
    fn form(&self) -> Option<&Form>;
    fn set_text(&mut self, key: &str, value: &str) -> CoreResult<()>;
    fn set_checked(&mut self, key: &str, checked: bool) -> CoreResult<()>;
}

impl FieldInput for EditorNavigator {
    fn form(&self) -> Option<&Form> {
        self.container().form()
    }
    fn set_text(&mut self, key: &str, value: &str) -> CoreResult<()> {
        EditorNavigator::set_text(self, key, value)
    }
    fn set_checked(&mut self, key: &str, checked: bool) -> CoreResult<()> {
        EditorNavigator::set_checked(self, key, checked)
    }
}

impl FieldInput for SettingsPage {
    fn form(&self) -> Option<&Form> {
        SettingsPage::form(self)
    }
    fn set_text(&mut self, key: &str, value: &str) -> CoreResult<()> {
        SettingsPage::set_text(self, key, value)
    }
    fn set_checked(&mut self, key: &str, checked: bool) -> CoreResult<()> {
        SettingsPage::set_checked(self, key, checked)
    }
}

impl FieldInput for Form {
    fn form(&self) -> Option<&Form> {
        Some(self)
    }
    fn set_text(&mut self, key: &str, value: &str) -> CoreResult<()> {
        Form::set_text(self, key, value)
    }
    fn set_checked(&mut self, key: &str, checked: bool) -> CoreResult<()> {
        Form::set_checked(self, key, checked)
    }
}

/// Type each assignment into the form, toggling checkboxes.
fn apply(target: &mut impl FieldInput, fields: &[Assignment]) -> Result<()> {
    for field in fields {
        let is_checkbox = target
            .form()
            .and_then(|form| form.table().get(&field.key))
            .is_some_and(|spec| spec.kind.is_checkbox());
        if is_checkbox {
            let Some(checked) = parse_bool(&field.value) else {
                bail!("{} expects true or false, got '{}'", field.key, field.value);
            };
            target.set_checked(&field.key, checked)?;
        } else {
            target.set_text(&field.key, &field.value)?;
        }
    }
    Ok(())
}

fn instance_line(index: usize, instance: &InstanceConfig) -> String {
    let mut line = format!("#{index} {}", instance.display_name(index));
    if AppSettings::is_default(index) {
        line.push_str(" (default)");
    }
    line.push_str(&format!("  {}", instance.api_url));
    let key = instance.masked_key();
    if !key.is_empty() {
        line.push_str(&format!("  key {key}"));
    }
    if !instance.enabled {
        line.push_str("  [disabled]");
    }
    line
}

fn server_line(index: usize, item: &Value) -> String {
    let text = |key: &str| item.get(key).and_then(Value::as_str).unwrap_or_default();
    let port = item.get("port").and_then(Value::as_u64).unwrap_or_default();
    let ssl = item.get("use_ssl").and_then(Value::as_bool).unwrap_or(true);
    format!(
        "#{index} {}  {}:{port}{}",
        text("name"),
        text("host"),
        if ssl { " (ssl)" } else { "" }
    )
}

/// Services shared by all commands.
pub struct Commands {
    ctx: Arc<ServiceContext>,
    prober: ConnectionProber,
    confirmer: StdinConfirmer,
}

impl Commands {
    pub fn new(ctx: Arc<ServiceContext>, confirmer: StdinConfirmer) -> Self {
        let prober = ConnectionProber::new(ctx.backend.clone(), &ctx.config);
        Self {
            ctx,
            prober,
            confirmer,
        }
    }

    fn instances(&self) -> InstanceService {
        InstanceService::new(Arc::clone(&self.ctx), self.prober.clone())
    }

    fn collections(&self) -> CollectionService {
        CollectionService::new(Arc::clone(&self.ctx), self.prober.clone())
    }

    fn editor(&self) -> EditorNavigator {
        EditorNavigator::new(
            Arc::clone(&self.ctx),
            Arc::new(self.confirmer),
            self.prober.clone(),
        )
    }

    pub async fn show(&self, app: AppType, with_status: bool) -> Result<()> {
        let service = self.instances();
        let instances = service.list(app).await?;
        if instances.is_empty() {
            println!("No {app} instances configured");
            return Ok(());
        }
        let statuses = if with_status {
            service.refresh_statuses(app).await?
        } else {
            Vec::new()
        };
        for (index, instance) in instances.iter().enumerate() {
            let status = statuses
                .iter()
                .find(|(i, _)| *i == index)
                .map(|(_, s)| format!("  {s}"))
                .unwrap_or_default();
            println!("{}{status}", instance_line(index, instance));
        }
        Ok(())
    }

    pub async fn render(&self, app: AppType, index: Option<usize>, new: bool) -> Result<()> {
        if app == AppType::NzbHunt {
            let index = if new { None } else { Some(index.unwrap_or(0)) };
            let container = self.collections().render_server(index).await?;
            println!("{}", container.markup());
            return Ok(());
        }
        if !app.has_instances() {
            let page = SettingsPage::load(Arc::clone(&self.ctx), app).await?;
            println!("{}", page.container().markup());
            return Ok(());
        }
        let mut editor = self.editor();
        let index = if new { None } else { Some(index.unwrap_or(0)) };
        editor.open(app, index).await?;
        println!("{}", editor.container().markup());
        editor.close();
        Ok(())
    }

    pub async fn test(&self, app: AppType, index: usize) -> Result<()> {
        let switcher = InstanceSwitcher::new(Arc::clone(&self.ctx), self.prober.clone());
        match switcher.switch_to(app, index).await? {
            SwitchOutcome::Applied(status) => {
                println!("{app} #{index}: {status}");
                if !status.is_connected() {
                    bail!("{app} #{index} is not reachable");
                }
            }
            SwitchOutcome::Stale => tracing::debug!("Status of {app} #{index} superseded"),
        }
        Ok(())
    }

    pub async fn set(&self, app: AppType, index: usize, fields: &[Assignment]) -> Result<()> {
        let mut editor = self.editor();
        editor.open(app, Some(index)).await?;
        apply(&mut editor, fields)?;
        if !editor.save_control().dirty {
            println!("No changes");
            editor.close();
            return Ok(());
        }
        let stored = editor.save().await?;
        println!("{}  {}", instance_line(index, &stored), editor.status());
        editor.close();
        Ok(())
    }

    pub async fn add(&self, app: AppType, fields: &[Assignment]) -> Result<()> {
        let mut editor = self.editor();
        editor.open(app, None).await?;
        apply(&mut editor, fields)?;
        let stored = editor.save().await?;
        let index = editor.session().and_then(|s| s.index).unwrap_or_default();
        println!("{}  {}", instance_line(index, &stored), editor.status());
        editor.close();
        Ok(())
    }

    pub async fn delete(&self, app: AppType, index: usize) -> Result<()> {
        let service = self.instances();
        let instances = service.list(app).await?;
        let Some(instance) = instances.get(index) else {
            bail!("{app} has no instance #{index}");
        };
        let question = format!("Delete {app} instance {}?", instance.display_name(index));
        if !self.confirmer.ask(question).await {
            println!("Cancelled");
            return Ok(());
        }
        let removed = service.delete(app, index).await?;
        println!("Deleted {}", removed.display_name(index));
        Ok(())
    }

    pub async fn servers_list(&self, with_status: bool) -> Result<()> {
        let service = self.collections();
        let servers = service.list(Collection::NzbServers).await?;
        if servers.is_empty() {
            println!("No usenet servers configured");
            return Ok(());
        }
        let statuses = if with_status {
            service.refresh_server_statuses().await?
        } else {
            Vec::new()
        };
        for (index, item) in servers.iter().enumerate() {
            let status = statuses
                .iter()
                .find(|(i, _)| *i == index)
                .map(|(_, s)| format!("  {s}"))
                .unwrap_or_default();
            println!("{}{status}", server_line(index, item));
        }
        Ok(())
    }

    pub async fn servers_add(&self, fields: &[Assignment]) -> Result<()> {
        let service = self.collections();
        let mut form = service.form(Collection::NzbServers, None).await?;
        apply(&mut form, fields)?;
        let (index, stored) = service
            .save_form(Collection::NzbServers, None, &form)
            .await?;
        println!("{}", server_line(index, &stored));
        Ok(())
    }

    pub async fn servers_test(&self, index: usize) -> Result<()> {
        let status = self.collections().test_server(index).await?;
        println!("Server #{index}: {status}");
        if !status.is_connected() {
            bail!("Server #{index} is not reachable");
        }
        Ok(())
    }

    pub async fn servers_delete(&self, index: usize) -> Result<()> {
        let service = self.collections();
        let item = service.get(Collection::NzbServers, index).await?;
        let name = item
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .map_or_else(|| format!("#{index}"), str::to_string);
        if !self.confirmer.ask(format!("Delete server {name}?")).await {
            println!("Cancelled");
            return Ok(());
        }
        service.delete(Collection::NzbServers, index).await?;
        println!("Deleted server {name}");
        Ok(())
    }

    pub async fn general_show(&self) -> Result<()> {
        let page = SettingsPage::load(Arc::clone(&self.ctx), AppType::General).await?;
        let Some(form) = page.form() else {
            bail!(
                "{}",
                page.container()
                    .error()
                    .unwrap_or("General settings could not be loaded")
            );
        };
        for spec in form.table().iter() {
            if let Some(value) = form.value(spec.key) {
                println!("{} = {}", spec.key, value.display());
            }
        }
        Ok(())
    }

    pub async fn general_set(&self, fields: &[Assignment]) -> Result<()> {
        let mut page = SettingsPage::load(Arc::clone(&self.ctx), AppType::General).await?;
        apply(&mut page, fields)?;
        if !page.is_dirty() {
            println!("No changes");
            return Ok(());
        }
        page.save_now().await?;
        Ok(())
    }
}
