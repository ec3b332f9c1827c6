//! Page data for server-rendered pages, loaded through the in-process shim.

use crate::client::{Envelope, EnvelopeError, LocalClient};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Serialize, Debug, Default, Clone, PartialEq)]
pub struct HomePage {
    pub hero_sections: Vec<Value>,
    pub services: Vec<Value>,
    pub categories: Vec<Value>,
    pub features: Vec<Value>,
    pub featured_news: Vec<Value>,
    pub header: Option<Value>,
    pub footer: Option<Value>,
    pub header_logo: Option<Value>,
    pub footer_logo: Option<Value>,
    /// `setting_key` → `setting_value`.
    pub settings: Map<String, Value>,
}

pub const FEATURED_NEWS_LIMIT: u32 = 5;

/// A failing section renders empty; the rest of the page still loads.
fn rows(section: &str, env: Envelope<Vec<Value>>) -> Vec<Value> {
    match env.into_result() {
        Ok(v) => v.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(section, error = %e, "page section unavailable");
            Vec::new()
        }
    }
}

fn one(section: &str, env: Envelope<Value>) -> Option<Value> {
    match env.into_result() {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(section, error = %e, "page section unavailable");
            None
        }
    }
}

fn settings_map(list: Vec<Value>) -> Map<String, Value> {
    list.into_iter()
        .filter_map(|row| {
            let key = row.get("setting_key")?.as_str()?.to_string();
            Some((key, row.get("setting_value").cloned().unwrap_or(Value::Null)))
        })
        .collect()
}

pub async fn load_home(client: &LocalClient) -> HomePage {
    let (hero, services, categories, features, news, header, footer, header_logo, footer_logo, settings) = tokio::join!(
        client
            .from("hero_sections")
            .select("*")
            .eq("is_active", true)
            .order("order_index", true)
            .fetch(),
        client.from("services").select("*").order("order_index", true).fetch(),
        client.from("categories").select("*").order("order_index", true).fetch(),
        client.from("features").select("*").order("order_index", true).fetch(),
        client
            .from("news")
            .select("*")
            .eq("is_featured", true)
            .order("published_at", false)
            .limit(FEATURED_NEWS_LIMIT)
            .fetch(),
        client.from("header_settings").select("*").limit(1).single(),
        client.from("footer_settings").select("*").limit(1).single(),
        client
            .from("logos")
            .select("*")
            .eq("logo_type", "header")
            .eq("is_active", true)
            .single(),
        client
            .from("logos")
            .select("*")
            .eq("logo_type", "footer")
            .eq("is_active", true)
            .single(),
        client.from("site_settings").select("setting_key,setting_value").fetch(),
    );

    HomePage {
        hero_sections: rows("hero_sections", hero),
        services: rows("services", services),
        categories: rows("categories", categories),
        features: rows("features", features),
        featured_news: rows("news", news),
        header: one("header_settings", header),
        footer: one("footer_settings", footer),
        header_logo: one("header_logo", header_logo),
        footer_logo: one("footer_logo", footer_logo),
        settings: settings_map(rows("site_settings", settings)),
    }
}

/// Service detail row, or None when the id matches nothing.
pub async fn load_service(client: &LocalClient, id: &str) -> Result<Option<Value>, EnvelopeError> {
    client.from("services").select("*").eq("id", id).single().await.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn settings_fold_into_a_map() {
        let m = settings_map(vec![
            json!({"setting_key": "phone", "setting_value": "+90 555"}),
            json!({"setting_value": "orphan"}),
        ]);
        assert_eq!(m.len(), 1);
        assert_eq!(m["phone"], json!("+90 555"));
    }

    #[test]
    fn failed_sections_render_empty() {
        assert!(rows("news", Envelope::err("boom")).is_empty());
        assert_eq!(one("header", Envelope::err("boom")), None);
    }
}
