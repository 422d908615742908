use crate::{
    domain::track::StoredTrack,
    storage::{
        db::i64_seconds_to_local_time,
        filter::{FilterField, LookupFilter},
    },
};

pub const LANDING_PAGE: &str = include_str!("../../html/index.html");
const LOOKUP_TEMPLATE: &str = include_str!("../../html/lookup.html");

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

fn format_created_at(created_at: i64) -> String {
    i64_seconds_to_local_time(created_at)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|_| created_at.to_string())
}

fn render_results(results: Option<&[StoredTrack]>) -> String {
    let Some(results) = results else {
        return String::new();
    };
    if results.is_empty() {
        return "<p>No tracks found.</p>".to_string();
    }

    let rows: String = results
        .iter()
        .map(|stored| {
            let track = &stored.track;
            format!(
                "<tr><td>{}</td><td><a href=\"{}\">{}</a></td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                track.track_id,
                escape_html(&track.track_url),
                escape_html(&track.track_title),
                escape_html(track.album_title.as_deref().unwrap_or_default()),
                escape_html(&track.band_name),
                format_created_at(stored.created_at),
            )
        })
        .collect();

    format!(
        "<p>{} track(s) found.</p>\n<table>\n<tr><th>ID</th><th>Title</th><th>Album</th><th>Band</th><th>Archived</th></tr>\n{rows}</table>",
        results.len()
    )
}

/// Lookup form, pre-filled from `filter`, followed by the results if a lookup ran.
///
/// Placeholders are filled in a single pass over the template, so text taken
/// from the filter or the results is never scanned for placeholders itself.
pub fn lookup_page(filter: &LookupFilter, results: Option<&[StoredTrack]>) -> String {
    let mut page = String::with_capacity(LOOKUP_TEMPLATE.len());
    let mut rest = LOOKUP_TEMPLATE;

    while let Some(start) = rest.find("{{") {
        let Some(len) = rest[start..].find("}}") else {
            break;
        };
        let name = &rest[start + 2..start + len];
        page.push_str(&rest[..start]);

        if name == "RESULTS" {
            page.push_str(&render_results(results));
        } else if let Some(field) = FilterField::ALL
            .into_iter()
            .find(|field| field.column().eq_ignore_ascii_case(name))
        {
            page.push_str(&escape_html(filter.get(field).unwrap_or_default()));
        } else {
            page.push_str(&rest[start..start + len + 2]);
        }
        rest = &rest[start + len + 2..];
    }

    page.push_str(rest);
    page
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::validate::sample_track;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn test_empty_form_has_no_placeholders_left() {
        let page = lookup_page(&LookupFilter::new(), None);

        assert!(!page.contains("{{"));
        assert!(!page.contains("track(s) found"));
    }

    #[test]
    fn test_results_keep_given_order_and_prefill_form() {
        let filter = LookupFilter::new().with(FilterField::BandName, "Band");
        let results = vec![
            StoredTrack {
                track: sample_track(2),
                created_at: 200,
            },
            StoredTrack {
                track: sample_track(1),
                created_at: 100,
            },
        ];

        let page = lookup_page(&filter, Some(results.as_slice()));

        assert!(page.contains("2 track(s) found"));
        assert!(page.contains("value=\"Band\""));
        let second = page.find("Song 2").unwrap();
        let first = page.find("Song 1").unwrap();
        assert!(second < first);
    }

    #[test]
    fn test_no_results_message() {
        let filter = LookupFilter::new().with(FilterField::BandName, "Nobody");

        assert!(lookup_page(&filter, Some(&[][..])).contains("No tracks found."));
    }

    #[test]
    fn test_filter_values_are_not_expanded() {
        let filter = LookupFilter::new()
            .with(FilterField::TrackTitle, "{{RESULTS}}")
            .with(FilterField::BandName, "{{TRACK_URL}}")
            .with(FilterField::TrackUrl, "https://x.example/track/a");
        let results = vec![StoredTrack {
            track: sample_track(1),
            created_at: 100,
        }];

        let page = lookup_page(&filter, Some(results.as_slice()));

        assert!(page.contains("value=\"{{RESULTS}}\""));
        assert!(page.contains("value=\"{{TRACK_URL}}\""));
        assert_eq!(page.matches("track(s) found").count(), 1);
    }

    #[test]
    fn test_stored_text_is_not_expanded() {
        let filter = LookupFilter::new().with(FilterField::BandName, "Band");
        let mut track = sample_track(1);
        track.track_title = "{{BAND_NAME}}".to_string();
        let results = vec![StoredTrack {
            track,
            created_at: 100,
        }];

        let page = lookup_page(&filter, Some(results.as_slice()));

        assert!(page.contains(">{{BAND_NAME}}</a>"));
    }
}
