//! Generic CRUD console.
//!
//! Each entity implements [`AdminModel`]; a [`ModelView`] wraps it with
//! optional column formatters and is registered in the [`AdminConsole`] as a
//! type-erased [`AdminView`] that speaks JSON.

pub mod models;
pub mod routes;

use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use camp_types::models::{Application, Event, Role, User};

use crate::error::AppError;
use crate::identity::IdentityProvider;

pub trait AdminModel: Serialize + Sized + Send + Sync + 'static {
    /// Body accepted by create and update.
    type Input: DeserializeOwned;

    /// Path segment under `/admin/`.
    const ENDPOINT: &'static str;
    const NAME: &'static str;

    fn count(idp: &IdentityProvider) -> Result<usize, AppError>;
    fn list(idp: &IdentityProvider) -> Result<Vec<Self>, AppError>;
    fn get(idp: &IdentityProvider, id: Uuid) -> Result<Option<Self>, AppError>;
    fn create(idp: &IdentityProvider, input: Self::Input) -> Result<Self, AppError>;
    fn update(idp: &IdentityProvider, id: Uuid, input: Self::Input) -> Result<Option<Self>, AppError>;
    fn delete(idp: &IdentityProvider, id: Uuid) -> Result<bool, AppError>;
}

/// Computes the displayed value of one column from a record.
pub type Formatter<M> = fn(&IdentityProvider, &M) -> Result<Value, AppError>;

/// Object-safe face of a registered view.
pub trait AdminView: Send + Sync {
    fn endpoint(&self) -> &'static str;
    fn name(&self) -> &'static str;
    fn count(&self, idp: &IdentityProvider) -> Result<usize, AppError>;
    fn list(&self, idp: &IdentityProvider) -> Result<Vec<Value>, AppError>;
    fn get(&self, idp: &IdentityProvider, id: Uuid) -> Result<Option<Value>, AppError>;
    fn create(&self, idp: &IdentityProvider, body: Value) -> Result<Value, AppError>;
    fn update(&self, idp: &IdentityProvider, id: Uuid, body: Value) -> Result<Option<Value>, AppError>;
    fn delete(&self, idp: &IdentityProvider, id: Uuid) -> Result<bool, AppError>;
}

pub struct ModelView<M> {
    formatters: Vec<(&'static str, Formatter<M>)>,
    _model: PhantomData<fn() -> M>,
}

impl<M: AdminModel> Default for ModelView<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: AdminModel> ModelView<M> {
    pub fn new() -> Self {
        Self {
            formatters: Vec::new(),
            _model: PhantomData,
        }
    }

    /// Sets `column` on every rendered record to the formatter's output,
    /// replacing the raw value if the column exists.
    pub fn with_formatter(mut self, column: &'static str, formatter: Formatter<M>) -> Self {
        self.formatters.push((column, formatter));
        self
    }

    fn render(&self, idp: &IdentityProvider, record: &M) -> Result<Value, AppError> {
        let mut value = serde_json::to_value(record).map_err(anyhow::Error::from)?;
        if let Value::Object(map) = &mut value {
            for (column, formatter) in &self.formatters {
                map.insert(column.to_string(), formatter(idp, record)?);
            }
        }
        Ok(value)
    }

    fn parse(body: Value) -> Result<M::Input, AppError> {
        serde_json::from_value(body).map_err(|e| AppError::Validation(e.to_string()))
    }
}

impl<M: AdminModel> AdminView for ModelView<M> {
    fn endpoint(&self) -> &'static str {
        M::ENDPOINT
    }

    fn name(&self) -> &'static str {
        M::NAME
    }

    fn count(&self, idp: &IdentityProvider) -> Result<usize, AppError> {
        M::count(idp)
    }

    fn list(&self, idp: &IdentityProvider) -> Result<Vec<Value>, AppError> {
        M::list(idp)?.iter().map(|r| self.render(idp, r)).collect()
    }

    fn get(&self, idp: &IdentityProvider, id: Uuid) -> Result<Option<Value>, AppError> {
        M::get(idp, id)?.map(|r| self.render(idp, &r)).transpose()
    }

    fn create(&self, idp: &IdentityProvider, body: Value) -> Result<Value, AppError> {
        let record = M::create(idp, Self::parse(body)?)?;
        self.render(idp, &record)
    }

    fn update(&self, idp: &IdentityProvider, id: Uuid, body: Value) -> Result<Option<Value>, AppError> {
        let input = Self::parse(body)?;
        M::update(idp, id, input)?
            .map(|r| self.render(idp, &r))
            .transpose()
    }

    fn delete(&self, idp: &IdentityProvider, id: Uuid) -> Result<bool, AppError> {
        M::delete(idp, id)
    }
}

#[derive(Default)]
pub struct AdminConsole {
    views: Vec<Box<dyn AdminView>>,
}

impl AdminConsole {
    pub fn add_view<V: AdminView + 'static>(&mut self, view: V) {
        self.views.push(Box::new(view));
    }

    pub fn view(&self, endpoint: &str) -> Option<&(dyn AdminView + 'static)> {
        self.views
            .iter()
            .find(|v| v.endpoint() == endpoint)
            .map(|v| v.as_ref())
    }

    pub fn views(&self) -> impl Iterator<Item = &(dyn AdminView + 'static)> {
        self.views.iter().map(|v| v.as_ref())
    }
}

/// Console with views for every entity, in menu order.
pub fn default_console() -> AdminConsole {
    let mut console = AdminConsole::default();
    console.add_view(ModelView::<Role>::new());
    console.add_view(ModelView::<User>::new().with_formatter("roles", models::role_names));
    console.add_view(ModelView::<Event>::new());
    console.add_view(
        ModelView::<Application>::new()
            .with_formatter("user", models::applicant_email)
            .with_formatter("event", models::event_title),
    );
    console
}
