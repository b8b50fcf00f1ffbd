//! Coordinate form field backed by a modal map picker and an optional
//! best-effort device location lookup.

use std::fmt;

use async_trait::async_trait;
use shared::domain::Coordinate;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::mount_guard::MountGuard;

pub const DEFAULT_MAP_CENTER: Coordinate = Coordinate::new(51.505, -0.09);
pub const DEFAULT_MAP_ZOOM: u8 = 15;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationUnavailable {
    #[error("geolocation is not supported here")]
    Unsupported,
    #[error("geolocation permission denied")]
    PermissionDenied,
    #[error("geolocation timed out")]
    Timeout,
    #[error("geolocation failed: {0}")]
    Other(String),
}

/// One-shot "where is this device" capability.
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    fn is_available(&self) -> bool {
        true
    }

    async fn current_position(&self) -> Result<Coordinate, LocationUnavailable>;
}

pub struct NoGeolocation;

#[async_trait]
impl GeolocationProvider for NoGeolocation {
    fn is_available(&self) -> bool {
        false
    }

    async fn current_position(&self) -> Result<Coordinate, LocationUnavailable> {
        Err(LocationUnavailable::Unsupported)
    }
}

/// Always reports the same estimate, e.g. a location taken from settings.
pub struct FixedGeolocation(pub Coordinate);

#[async_trait]
impl GeolocationProvider for FixedGeolocation {
    async fn current_position(&self) -> Result<Coordinate, LocationUnavailable> {
        Ok(self.0)
    }
}

/// Identifies the modal opening a lookup was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupTicket {
    pub opening: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupState {
    NotRequested,
    Pending,
    Centered(Coordinate),
    Unavailable(LocationUnavailable),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ModalPhase {
    AwaitingInput,
    MarkerPlaced(Coordinate),
}

/// The open map overlay. Holds a single working marker; a device location
/// estimate only recenters the map and never places the marker.
#[derive(Debug)]
pub struct MapModal {
    opening: u64,
    guard: MountGuard,
    center: Coordinate,
    marker: Option<Coordinate>,
    lookup: LookupState,
}

impl MapModal {
    fn open(opening: u64, locate: bool) -> (Self, Option<LookupTicket>) {
        let mut modal = Self {
            opening,
            guard: MountGuard::new(),
            center: DEFAULT_MAP_CENTER,
            marker: None,
            lookup: LookupState::NotRequested,
        };
        // Mount-time position report is suppressed; the empty marker must not
        // reach the form.
        modal.guard.flush();

        let ticket = locate.then(|| modal.request_lookup());
        (modal, ticket)
    }

    pub fn phase(&self) -> ModalPhase {
        match self.marker {
            Some(marker) => ModalPhase::MarkerPlaced(marker),
            None => ModalPhase::AwaitingInput,
        }
    }

    pub fn center(&self) -> Coordinate {
        self.center
    }

    pub fn zoom(&self) -> u8 {
        DEFAULT_MAP_ZOOM
    }

    pub fn marker(&self) -> Option<Coordinate> {
        self.marker
    }

    pub fn lookup(&self) -> &LookupState {
        &self.lookup
    }

    /// Replaces the working marker and returns the position to report, if any.
    /// Re-clicking the current working marker reports nothing.
    fn place_marker(&mut self, coordinate: Coordinate) -> Option<Coordinate> {
        if self.marker == Some(coordinate) {
            return None;
        }
        self.marker = Some(coordinate);
        self.guard.gate(|| coordinate)
    }

    fn request_lookup(&mut self) -> LookupTicket {
        self.lookup = LookupState::Pending;
        LookupTicket {
            opening: self.opening,
        }
    }
}

pub type ChangeHandler = Box<dyn FnMut(Option<Coordinate>) + Send>;
pub type BlurHandler = Box<dyn FnMut() + Send>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDisplay {
    pub name: String,
    pub value: String,
    pub placeholder: &'static str,
}

/// Controlled composite field: one logical form value rendered as two
/// read-only inputs (`<name>.lat`, `<name>.lng`) plus a map affordance.
pub struct CoordinatePicker {
    name: String,
    guard: MountGuard,
    location: Option<Coordinate>,
    modal: Option<MapModal>,
    openings: u64,
    geolocation: bool,
    on_change: Option<ChangeHandler>,
    on_blur: Option<BlurHandler>,
}

impl fmt::Debug for CoordinatePicker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinatePicker")
            .field("name", &self.name)
            .field("mounted", &self.guard.mounted())
            .field("location", &self.location)
            .field("modal", &self.modal)
            .finish_non_exhaustive()
    }
}

impl CoordinatePicker {
    pub fn new(name: impl Into<String>, value: Option<Coordinate>) -> Self {
        Self {
            name: name.into(),
            guard: MountGuard::new(),
            location: value,
            modal: None,
            openings: 0,
            geolocation: false,
            on_change: None,
            on_blur: None,
        }
    }

    /// Whether a device lookup should be attempted each time the map opens.
    pub fn with_geolocation(mut self, available: bool) -> Self {
        self.geolocation = available;
        self
    }

    pub fn on_change(mut self, handler: impl FnMut(Option<Coordinate>) + Send + 'static) -> Self {
        self.on_change = Some(Box::new(handler));
        self
    }

    pub fn on_blur(mut self, handler: impl FnMut() + Send + 'static) -> Self {
        self.on_blur = Some(Box::new(handler));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<Coordinate> {
        self.location
    }

    pub fn is_open(&self) -> bool {
        self.modal.is_some()
    }

    pub fn modal(&self) -> Option<&MapModal> {
        self.modal.as_ref()
    }

    pub fn lat_field(&self) -> FieldDisplay {
        FieldDisplay {
            name: format!("{}.lat", self.name),
            value: self.location.map(|c| c.lat.to_string()).unwrap_or_default(),
            placeholder: "Latitude",
        }
    }

    pub fn lng_field(&self) -> FieldDisplay {
        FieldDisplay {
            name: format!("{}.lng", self.name),
            value: self.location.map(|c| c.lng.to_string()).unwrap_or_default(),
            placeholder: "Longitude",
        }
    }

    /// First render commit. The initial controlled value is not reported.
    pub fn mount(&mut self) {
        self.location_changed();
        self.guard.flush();
    }

    /// `closed -> open`. Returns a lookup ticket when a device estimate should
    /// be requested for this opening.
    pub fn open(&mut self) -> Option<LookupTicket> {
        if self.modal.is_some() {
            return None;
        }
        self.openings += 1;
        let (modal, ticket) = MapModal::open(self.openings, self.geolocation);
        debug!(field = %self.name, opening = self.openings, "map picker opened");
        self.modal = Some(modal);
        ticket
    }

    /// `open -> closed`. The last placed marker stays committed.
    pub fn close(&mut self) {
        if self.modal.take().is_some() {
            debug!(field = %self.name, "map picker closed");
        }
    }

    /// User click on the map. Ignored while the modal is closed.
    pub fn place_marker(&mut self, coordinate: Coordinate) -> bool {
        let Some(modal) = self.modal.as_mut() else {
            return false;
        };
        // Every change of the working marker is reported, even when it matches
        // the mirrored value: the parent may have reset without syncing back.
        if let Some(reported) = modal.place_marker(coordinate) {
            self.location = Some(reported);
            self.location_changed();
        }
        true
    }

    /// Feeds a device lookup result back. Results for a closed or reopened
    /// modal are dropped. Failures leave manual picking as the only path. An
    /// estimate arriving after the user placed a marker leaves the map where it is.
    pub fn apply_lookup(
        &mut self,
        ticket: LookupTicket,
        outcome: Result<Coordinate, LocationUnavailable>,
    ) -> bool {
        let Some(modal) = self.modal.as_mut() else {
            debug!(field = %self.name, "dropping lookup for closed map picker");
            return false;
        };
        if modal.opening != ticket.opening || modal.lookup != LookupState::Pending {
            debug!(field = %self.name, opening = ticket.opening, "dropping stale lookup");
            return false;
        }
        match outcome {
            Ok(estimate) => {
                if modal.marker.is_none() {
                    modal.center = estimate;
                }
                modal.lookup = LookupState::Centered(estimate);
            }
            Err(reason) => {
                debug!(field = %self.name, "device location unavailable: {reason}");
                modal.lookup = LookupState::Unavailable(reason);
            }
        }
        true
    }

    /// Re-issues the lookup after a failure.
    pub fn retry_lookup(&mut self) -> Option<LookupTicket> {
        let modal = self.modal.as_mut()?;
        match modal.lookup {
            LookupState::Unavailable(_) if self.geolocation => Some(modal.request_lookup()),
            _ => None,
        }
    }

    /// Parent pushed a new controlled value. Mirrors it without reporting back.
    pub fn sync_value(&mut self, value: Option<Coordinate>) {
        self.location = value;
    }

    pub fn blur(&mut self) {
        if let Some(handler) = self.on_blur.as_mut() {
            handler();
        }
    }

    fn location_changed(&mut self) {
        let location = self.location;
        let on_change = &mut self.on_change;
        let reported = self.guard.gate(|| {
            if let Some(handler) = on_change.as_mut() {
                handler(location);
            }
        });
        if reported.is_some() {
            info!(field = %self.name, ?location, "coordinate changed");
        }
    }
}

/// Performs the one-shot device lookup for `ticket` without holding the
/// picker across the wait, then applies the result.
pub async fn run_lookup(
    picker: &Mutex<CoordinatePicker>,
    provider: &dyn GeolocationProvider,
    ticket: LookupTicket,
) -> bool {
    let outcome = provider.current_position().await;
    picker.lock().await.apply_lookup(ticket, outcome)
}

#[cfg(test)]
#[path = "tests/location_tests.rs"]
mod tests;
