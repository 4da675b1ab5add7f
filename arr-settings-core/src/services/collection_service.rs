//! List-valued sub-resources (usenet servers, categories, hunt instances)
//!
//! Items are addressed by position. After a successful delete the local
//! list is re-indexed the same way the backend does it.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use arr_settings_api::{AppType, Collection};

use crate::error::{CoreError, CoreResult};
use crate::schema::FieldTable;
use crate::services::{
    ConnectionProber, FormContainer, FormRenderer, ProbeTarget, ServiceContext,
};
use crate::types::{ConnectionStatus, EntityKey, EntityScope, Form, Notification};

/// Collection service
pub struct CollectionService {
    ctx: Arc<ServiceContext>,
    prober: ConnectionProber,
    items: RwLock<HashMap<Collection, Vec<Value>>>,
}

impl CollectionService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>, prober: ConnectionProber) -> Self {
        Self {
            ctx,
            prober,
            items: RwLock::new(HashMap::new()),
        }
    }

    /// Fetch the list from the backend and remember it.
    pub async fn refresh(&self, collection: Collection) -> CoreResult<Vec<Value>> {
        let items = self.ctx.backend.list_items(collection).await?;
        self.items
            .write()
            .await
            .insert(collection, items.clone());
        Ok(items)
    }

    /// Last fetched list, fetching it first if needed.
    pub async fn list(&self, collection: Collection) -> CoreResult<Vec<Value>> {
        if let Some(items) = self.items.read().await.get(&collection) {
            return Ok(items.clone());
        }
        self.refresh(collection).await
    }

    pub async fn get(&self, collection: Collection, index: usize) -> CoreResult<Value> {
        self.list(collection)
            .await?
            .get(index)
            .cloned()
            .ok_or(CoreError::ItemNotFound { collection, index })
    }

    /// Form for item `index`, or for a new item.
    pub async fn form(&self, collection: Collection, index: Option<usize>) -> CoreResult<Form> {
        let source = match index {
            Some(i) => self.get(collection, i).await?,
            None => Value::Null,
        };
        FormRenderer::build_form(FieldTable::for_collection(collection), &source)
    }

    /// Server editor markup for server `index`, or for a new server.
    pub async fn render_server(&self, index: Option<usize>) -> CoreResult<FormContainer> {
        let source = match index {
            Some(i) => self.get(Collection::NzbServers, i).await?,
            None => Value::Null,
        };
        let mut container = FormContainer::new();
        FormRenderer::render(&mut container, AppType::NzbHunt, &source, index);
        Ok(container)
    }

    /// Persist a form: update item `index`, or append when `index` is `None`.
    ///
    /// Returns the position and the stored item.
    pub async fn save_form(
        &self,
        collection: Collection,
        index: Option<usize>,
        form: &Form,
    ) -> CoreResult<(usize, Value)> {
        if let Err(e) = form.validate() {
            self.ctx
                .report_error(&format!("Saving {}", collection.item_label()), &e);
            return Err(e);
        }
        let item = Value::Object(form.read_back());
        match index {
            Some(i) => Ok((i, self.update(collection, i, &item).await?)),
            None => self.create(collection, &item).await,
        }
    }

    /// Append an item.
    ///
    /// The list is fetched first so the returned position matches the
    /// backend's.
    pub async fn create(&self, collection: Collection, item: &Value) -> CoreResult<(usize, Value)> {
        self.list(collection).await?;
        let stored = self
            .ctx
            .backend
            .create_item(collection, item)
            .await
            .map_err(|e| self.failed(collection, "Creating", e.into()))?;

        let mut items = self.items.write().await;
        let list = items.entry(collection).or_default();
        list.push(stored.clone());
        let index = list.len() - 1;
        drop(items);

        self.prober.rekey(
            EntityKey::item(collection, None),
            EntityKey::item(collection, Some(index)),
        );
        self.ctx.notifier.notify(Notification::success(format!(
            "Added {}",
            collection.item_label()
        )));
        Ok((index, stored))
    }

    /// Replace item `index`.
    pub async fn update(
        &self,
        collection: Collection,
        index: usize,
        item: &Value,
    ) -> CoreResult<Value> {
        let stored = self
            .ctx
            .backend
            .update_item(collection, index, item)
            .await
            .map_err(|e| self.failed(collection, "Updating", e.into()))?;

        if let Some(slot) = self
            .items
            .write()
            .await
            .get_mut(&collection)
            .and_then(|list| list.get_mut(index))
        {
            *slot = stored.clone();
        }
        self.ctx.notifier.notify(Notification::success(format!(
            "Saved {}",
            collection.item_label()
        )));
        Ok(stored)
    }

    /// Remove item `index`; later items shift down by one.
    pub async fn delete(&self, collection: Collection, index: usize) -> CoreResult<()> {
        self.ctx
            .backend
            .delete_item(collection, index)
            .await
            .map_err(|e| self.failed(collection, "Deleting", e.into()))?;

        if let Some(list) = self.items.write().await.get_mut(&collection)
            && index < list.len()
        {
            list.remove(index);
        }
        self.prober
            .remove_and_shift(EntityScope::Collection(collection), index);
        log::info!("Deleted {} #{index}", collection.item_label());
        Ok(())
    }

    /// Probe saved server `index`, reusing its stored password.
    pub async fn test_server(&self, index: usize) -> CoreResult<ConnectionStatus> {
        let item = self.get(Collection::NzbServers, index).await?;
        let target = ProbeTarget::from_server_item(&item, Some(index));
        let key = EntityKey::item(Collection::NzbServers, Some(index));
        Ok(self.prober.probe_now(key, &target).await)
    }

    /// Probe a server form; a blank password on a saved server reuses the
    /// stored one.
    pub async fn test_server_form(&self, form: &Form, index: Option<usize>) -> ConnectionStatus {
        let target = ProbeTarget::from_server_form(form, index);
        let key = EntityKey::item(Collection::NzbServers, index);
        self.prober.probe_now(key, &target).await
    }

    /// Probe every saved server concurrently.
    pub async fn refresh_server_statuses(&self) -> CoreResult<Vec<(usize, ConnectionStatus)>> {
        let servers = self.list(Collection::NzbServers).await?;
        let targets = servers
            .iter()
            .enumerate()
            .map(|(i, item)| {
                (
                    EntityKey::item(Collection::NzbServers, Some(i)),
                    ProbeTarget::from_server_item(item, Some(i)),
                )
            })
            .collect();
        Ok(self
            .prober
            .probe_all(targets)
            .await
            .into_iter()
            .filter_map(|(key, status)| key.index.map(|i| (i, status)))
            .collect())
    }

    fn failed(&self, collection: Collection, action: &str, err: CoreError) -> CoreError {
        self.ctx
            .report_error(&format!("{action} {} failed", collection.item_label()), &err);
        err
    }
}
