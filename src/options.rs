use serde::Deserialize;

/// Options for Track to GeoJSON conversion.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertOptions {
    /// Include elevation as the 3rd coordinate value (default: true)
    #[serde(default = "default_true")]
    pub include_elevation: bool,

    /// Include the track name in properties (default: true)
    #[serde(default = "default_true")]
    pub include_metadata: bool,

    /// Keep `<trkseg>` breaks as a MultiLineString instead of one
    /// continuous LineString (default: false)
    #[serde(default)]
    pub preserve_segments: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            include_elevation: true,
            include_metadata: true,
            preserve_segments: false,
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_object() {
        let opts: ConvertOptions = serde_json::from_str("{}").unwrap();
        assert!(opts.include_elevation);
        assert!(opts.include_metadata);
        assert!(!opts.preserve_segments);
    }

    #[test]
    fn test_camel_case_keys() {
        let opts: ConvertOptions =
            serde_json::from_str(r#"{"includeElevation": false, "preserveSegments": true}"#)
                .unwrap();
        assert!(!opts.include_elevation);
        assert!(opts.preserve_segments);
    }
}
