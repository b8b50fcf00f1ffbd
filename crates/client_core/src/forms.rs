//! Create-package and create-delivery form state.

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Arc, Mutex},
};

use shared::{
    domain::{Coordinate, Package, PackageId},
    protocol::{CreateDeliveryRequest, CreatePackageRequest},
};
use thiserror::Error;
use tracing::{info, warn};

use crate::{location::CoordinatePicker, AdminClient, ClientError};

pub const PACKAGE_CREATED_MESSAGE: &str = "The package has been successfully created.";
pub const DELIVERY_CREATED_MESSAGE: &str = "The delivery has been successfully created.";

/// Validation messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{} invalid field(s): {}", .0.len(), FieldList(.0))]
pub struct FieldErrors(BTreeMap<&'static str, String>);

struct FieldList<'a>(&'a BTreeMap<&'static str, String>);

impl fmt::Display for FieldList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

impl FieldErrors {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] FieldErrors),
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl SubmitError {
    pub fn alert_message(&self) -> Option<String> {
        match self {
            Self::Invalid(_) => None,
            Self::Client(err) => Some(err.alert_message()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationField {
    From,
    To,
}

impl LocationField {
    pub fn name(&self) -> &'static str {
        match self {
            Self::From => "from_location",
            Self::To => "to_location",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageForm {
    pub description: String,
    pub weight: f64,
    pub width: f64,
    pub height: f64,
    pub depth: f64,
    pub from_name: String,
    pub from_address: String,
    pub to_name: String,
    pub to_address: String,
    from_location: Option<Coordinate>,
    to_location: Option<Coordinate>,
    errors: FieldErrors,
}

impl PackageForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn location(&self, field: LocationField) -> Option<Coordinate> {
        match field {
            LocationField::From => self.from_location,
            LocationField::To => self.to_location,
        }
    }

    /// Field-level change from a coordinate picker. Only concrete coordinates
    /// are stored; a cleared picker leaves the previous value in place.
    pub fn set_location(&mut self, field: LocationField, value: Option<Coordinate>) {
        let Some(value) = value else {
            return;
        };
        match field {
            LocationField::From => self.from_location = Some(value),
            LocationField::To => self.to_location = Some(value),
        }
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn validate(&mut self) -> Result<CreatePackageRequest, FieldErrors> {
        let mut errors = FieldErrors::default();
        required(&mut errors, "description", &self.description, "The description is required.");
        positive(&mut errors, "weight", self.weight);
        positive(&mut errors, "width", self.width);
        positive(&mut errors, "height", self.height);
        positive(&mut errors, "depth", self.depth);
        required(&mut errors, "from_name", &self.from_name, "The from name is required.");
        required(
            &mut errors,
            "from_address",
            &self.from_address,
            "The from address is required.",
        );
        if self.from_location.is_none() {
            errors.insert("from_location", "The from location is required.");
        }
        required(&mut errors, "to_name", &self.to_name, "The recipient name is required.");
        required(
            &mut errors,
            "to_address",
            &self.to_address,
            "The recipient address is required.",
        );
        if self.to_location.is_none() {
            errors.insert("to_location", "The recipient location is required.");
        }

        self.errors = errors.clone();
        let (Some(from_location), Some(to_location)) = (self.from_location, self.to_location)
        else {
            return Err(errors);
        };
        errors.into_result(|| CreatePackageRequest {
            description: self.description.trim().to_string(),
            weight: self.weight,
            width: self.width,
            height: self.height,
            depth: self.depth,
            from_name: self.from_name.trim().to_string(),
            from_address: self.from_address.trim().to_string(),
            from_location,
            to_name: self.to_name.trim().to_string(),
            to_address: self.to_address.trim().to_string(),
            to_location,
        })
    }
}

fn required(errors: &mut FieldErrors, field: &'static str, value: &str, message: &str) {
    if value.trim().is_empty() {
        errors.insert(field, message);
    }
}

fn positive(errors: &mut FieldErrors, field: &'static str, value: f64) {
    if !value.is_finite() {
        errors.insert(field, format!("The {field} must be a number."));
    } else if value <= 0.0 {
        errors.insert(field, format!("The {field} must be greater than 0."));
    }
}

/// Builds a picker whose changes flow into `form` under `field`.
pub fn bind_location_picker(form: &Arc<Mutex<PackageForm>>, field: LocationField) -> CoordinatePicker {
    let value = form.lock().ok().and_then(|form| form.location(field));
    let form = Arc::clone(form);
    CoordinatePicker::new(field.name(), value).on_change(move |value| match form.lock() {
        Ok(mut form) => form.set_location(field, value),
        Err(_) => warn!(field = field.name(), "package form lock poisoned; dropping change"),
    })
}

pub async fn submit_package(
    client: &AdminClient,
    form: &mut PackageForm,
) -> Result<&'static str, SubmitError> {
    let request = form.validate()?;
    client.create_package(&request).await?;
    form.reset();
    Ok(PACKAGE_CREATED_MESSAGE)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOption {
    pub value: PackageId,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageOptions {
    Loading,
    Loaded(Vec<PackageOption>),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryForm {
    pub package_id: String,
    options: PackageOptions,
    errors: FieldErrors,
}

impl Default for DeliveryForm {
    fn default() -> Self {
        Self {
            package_id: String::new(),
            options: PackageOptions::Loading,
            errors: FieldErrors::default(),
        }
    }
}

impl DeliveryForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(&self) -> &PackageOptions {
        &self.options
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn placeholder(&self) -> &'static str {
        match self.options {
            PackageOptions::Loading => "loading...",
            _ => "-- Select a package --",
        }
    }

    pub fn set_packages(&mut self, packages: Result<Vec<Package>, ClientError>) {
        self.options = match packages {
            Ok(packages) => PackageOptions::Loaded(
                packages
                    .into_iter()
                    .map(|package| PackageOption {
                        value: package.package_id,
                        label: package.description,
                    })
                    .collect(),
            ),
            Err(err) => {
                warn!("failed to load package options: {err}");
                PackageOptions::Failed(err.alert_message())
            }
        };
    }

    pub async fn load_packages(&mut self, client: &AdminClient) {
        self.options = PackageOptions::Loading;
        let packages = client.all_packages().await;
        self.set_packages(packages);
    }

    pub fn reset(&mut self) {
        self.package_id.clear();
        self.errors = FieldErrors::default();
    }

    pub fn validate(&mut self) -> Result<CreateDeliveryRequest, FieldErrors> {
        let mut errors = FieldErrors::default();
        required(&mut errors, "package_id", &self.package_id, "The package is required.");
        self.errors = errors.clone();
        errors.into_result(|| CreateDeliveryRequest {
            package_id: PackageId(self.package_id.trim().to_string()),
        })
    }
}

pub async fn submit_delivery(
    client: &AdminClient,
    form: &mut DeliveryForm,
) -> Result<&'static str, SubmitError> {
    let request = form.validate()?;
    client.create_delivery(&request).await?;
    info!(package_id = %request.package_id, "delivery submitted");
    form.reset();
    Ok(DELIVERY_CREATED_MESSAGE)
}

#[cfg(test)]
#[path = "tests/forms_tests.rs"]
mod tests;
