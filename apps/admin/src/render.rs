//! Plain-text rendering of list cards and picker fields.

use std::fmt::Write as _;

use client_core::{
    location::CoordinatePicker,
    pagination::{ListPresentation, Spinner},
};
use shared::domain::{Delivery, Package};

pub fn package_row(package: &Package) -> String {
    let active = match &package.active_delivery {
        Some(delivery) => format!("Yes | {}", delivery.status.as_str().to_uppercase()),
        None => "No".to_string(),
    };
    format!(
        "{:<26} {:<24} {} ({}) -> {} ({})  [{}]",
        package.package_id,
        package.description,
        package.from_name,
        package.from_address,
        package.to_name,
        package.to_address,
        active
    )
}

pub fn delivery_row(delivery: &Delivery) -> String {
    format!(
        "{:<24} {} ({}) -> {} ({})  [{}]",
        delivery.package.description,
        delivery.package.from_name,
        delivery.package.from_address,
        delivery.package.to_name,
        delivery.package.to_address,
        delivery.status.as_str().to_uppercase()
    )
}

pub fn list_card<T>(
    title: &str,
    presentation: &ListPresentation<'_, T>,
    row: impl Fn(&T) -> String,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {title} ==");

    if presentation.spinner == Spinner::FullPage {
        let _ = writeln!(out, "  loading...");
        return out;
    }
    if let Some(message) = presentation.error_message {
        let _ = writeln!(out, "  {message} (r to retry)");
        return out;
    }

    for item in presentation.rows {
        let _ = writeln!(out, "  {}", row(item));
    }
    if let Some(message) = presentation.empty_message {
        let _ = writeln!(out, "  {message}");
    }

    let mut controls = Vec::new();
    if presentation.show_previous {
        controls.push("[p] Previous");
    }
    if presentation.show_next {
        controls.push("[n] Next");
    }
    if presentation.spinner == Spinner::Button {
        controls.push("(refreshing...)");
    }
    if let Some((page, pages)) = presentation.position {
        let _ = write!(out, "  page {page}/{pages}");
        if !controls.is_empty() {
            let _ = write!(out, "  {}", controls.join("  "));
        }
        let _ = writeln!(out);
    }
    out
}

pub fn picker_fields(picker: &CoordinatePicker) -> String {
    let lat = picker.lat_field();
    let lng = picker.lng_field();
    let show = |value: &str, placeholder: &str| {
        if value.is_empty() {
            format!("<{placeholder}>")
        } else {
            value.to_string()
        }
    };
    format!(
        "{}={} {}={}",
        lat.name,
        show(&lat.value, lat.placeholder),
        lng.name,
        show(&lng.value, lng.placeholder)
    )
}
