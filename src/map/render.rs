use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;

use super::MapPlan;

const LEAFLET_VERSION: &str = "1.9.4";

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<meta name="generator" content="meeting_map __GENERATED__">
<title>Meeting map</title>
<link rel="stylesheet" href="https://unpkg.com/leaflet@__LEAFLET__/dist/leaflet.css">
<script src="https://unpkg.com/leaflet@__LEAFLET__/dist/leaflet.js"></script>
<style>html, body, #map { height: 100%; margin: 0; }</style>
</head>
<body>
<div id="map"></div>
<script>
var map = L.map("map").setView([__LAT__, __LON__], __ZOOM__);
L.tileLayer("https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png", {
  maxZoom: 19,
  attribution: "&copy; OpenStreetMap contributors"
}).addTo(map);
var markers = __MARKERS__;
markers.forEach(function (m) {
  L.marker([m.lat, m.lon], { title: m.address }).bindPopup(m.popup, { maxWidth: 400 }).addTo(map);
});
</script>
</body>
</html>
"#;

#[derive(Serialize)]
struct MarkerJson<'a> {
    lat: f64,
    lon: f64,
    address: &'a str,
    popup: &'a str,
}

/// A standalone Leaflet page showing every marker of `plan`.
pub fn render_html(plan: &MapPlan) -> Result<String> {
    let markers: Vec<MarkerJson> = plan
        .markers
        .iter()
        .map(|m| MarkerJson {
            lat: m.coord.lat,
            lon: m.coord.lon,
            address: &m.address,
            popup: &m.popup,
        })
        .collect();
    // "</script>" inside a popup must not close the inline script.
    let markers = serde_json::to_string(&markers)?.replace("</", "<\\/");

    Ok(PAGE
        .replace("__GENERATED__", &Local::now().format("%Y-%m-%d %H:%M:%S").to_string())
        .replace("__LEAFLET__", LEAFLET_VERSION)
        .replace("__LAT__", &plan.center.lat.to_string())
        .replace("__LON__", &plan.center.lon.to_string())
        .replace("__ZOOM__", &plan.zoom.to_string())
        .replace("__MARKERS__", &markers))
}

pub fn write_map(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {:?}", parent))?;
    }
    fs::write(path, html).with_context(|| format!("Failed to write {:?}", path))
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Marker;
    use crate::source::geocode::Coord;

    fn plan(markers: Vec<Marker>) -> MapPlan {
        MapPlan {
            center: Coord {
                lat: 39.7684,
                lon: -86.1581,
            },
            zoom: 12,
            markers,
        }
    }

    #[test]
    fn empty_plan_renders_default_view() {
        let html = render_html(&plan(vec![])).unwrap();
        assert!(html.contains("setView([39.7684, -86.1581], 12)"));
        assert!(html.contains("var markers = [];"));
        assert!(!html.contains("__"));
    }

    #[test]
    fn markers_embedded_as_json() {
        let html = render_html(&plan(vec![Marker {
            coord: Coord {
                lat: 39.93,
                lon: -85.85,
            },
            address: "123 W Main St, Fortville, IN".into(),
            popup: "<b>Address:</b> x</script><script>alert(1)".into(),
        }]))
        .unwrap();
        assert!(html.contains("\"lat\":39.93"));
        assert!(html.contains("123 W Main St, Fortville, IN"));
        assert_eq!(html.matches("</script>").count(), 2);
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn writes_into_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("static").join("meeting_map.html");
        write_map(&path, "<html></html>").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "<html></html>");
    }
}
