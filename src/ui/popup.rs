use crate::data::record::GeoRecord;
use serde::{Deserialize, Serialize};

/// Text shown in a pointer popup, a hover tooltip or the touch preview panel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopupContent {
    pub record_id: String,
    pub title: String,
    pub price: String,
    pub address: String,
    pub property_type: String,
    /// "3 bd · 2 ba · 120 m²"
    pub facts: String,
    pub image_ref: Option<String>,
    pub link: String,
}

impl PopupContent {
    pub fn for_record(record: &GeoRecord) -> Self {
        let mut facts = vec![
            format!("{} bd", record.bedrooms),
            format!("{} ba", trim_number(record.bathrooms)),
        ];
        if record.area > 0.0 {
            facts.push(format!("{} m²", group_thousands(record.area.round() as i64)));
        }

        Self {
            record_id: record.id.clone(),
            title: record.title.clone(),
            price: format_price(record.price),
            address: record.address_line.clone(),
            property_type: record.property_type.clone(),
            facts: facts.join(" · "),
            image_ref: record.image_ref.clone(),
            link: format!("/properties/{}", record.id),
        }
    }

    /// Single-line text for hover tooltips
    pub fn tooltip_text(&self) -> String {
        if self.address.is_empty() {
            format!("{} · {}", self.title, self.price)
        } else {
            format!("{} · {} · {}", self.title, self.price, self.address)
        }
    }
}

/// Whole euros, grouped by thousands: `€125,000`
pub fn format_price(price: f64) -> String {
    let rounded = price.round() as i64;
    if rounded < 0 {
        format!("-€{}", group_thousands(-rounded))
    } else {
        format!("€{}", group_thousands(rounded))
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn trim_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.1}", value)
    }
}
