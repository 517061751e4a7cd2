//! WebAssembly bindings for SiteFilter
//!
//! Exposes rule matching and root-domain helpers to the extension's JS, and
//! adapts `chrome.storage.local` in both directions: as JS promises
//! (`setStorage` / `getStorage`) and as a Rust [`StorageArea`].

use futures::channel::oneshot;
use js_sys::{Function, Object, Promise, Reflect};
use serde_json::Value;
use sf_core::{
    domain::root_domain_of_host,
    matcher::{first_match, matches_rule},
    storage::{StorageArea, StorageError},
    types::{FilterRuleItem, RuleType},
    url::UrlView,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

// =============================================================================
// chrome.storage.local
// =============================================================================

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = set)]
    fn chrome_storage_set(items: &Object, callback: &Function) -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = get)]
    fn chrome_storage_get(key: &str, callback: &Function) -> Result<(), JsValue>;
}

/// Current `chrome.runtime.lastError`, if set.
///
/// Read on every call: the browser only sets it for the duration of a callback.
fn last_error() -> Option<JsValue> {
    let chrome = Reflect::get(&js_sys::global(), &"chrome".into()).ok()?;
    let runtime = Reflect::get(&chrome, &"runtime".into()).ok()?;
    let error = Reflect::get(&runtime, &"lastError".into()).ok()?;
    if error.is_undefined() || error.is_null() {
        None
    } else {
        Some(error)
    }
}

/// Issue `chrome.storage.local.set({[key]: value})` and report completion once.
fn storage_set(key: &str, value: &JsValue, on_done: impl FnOnce(Result<(), JsValue>) + 'static) {
    let items = Object::new();
    if let Err(e) = Reflect::set(&items, &JsValue::from_str(key), value) {
        on_done(Err(e));
        return;
    }

    // The host may throw synchronously instead of calling back, so `on_done`
    // is shared between the callback and the error path.
    let on_done = std::rc::Rc::new(std::cell::RefCell::new(Some(on_done)));
    let on_callback = on_done.clone();
    let callback = Closure::once_into_js(move || {
        if let Some(done) = on_callback.borrow_mut().take() {
            done(match last_error() {
                Some(err) => Err(err),
                None => Ok(()),
            });
        }
    });

    if let Err(e) = chrome_storage_set(&items, callback.unchecked_ref()) {
        if let Some(done) = on_done.borrow_mut().take() {
            done(Err(e));
        }
    }
}

/// Issue `chrome.storage.local.get(key)` and report `result[key]` once.
///
/// An absent key reports `Ok(undefined)`.
fn storage_get(key: &str, on_done: impl FnOnce(Result<JsValue, JsValue>) + 'static) {
    let on_done = std::rc::Rc::new(std::cell::RefCell::new(Some(on_done)));
    let on_callback = on_done.clone();
    let lookup = JsValue::from_str(key);
    let callback = Closure::once_into_js(move |result: JsValue| {
        if let Some(done) = on_callback.borrow_mut().take() {
            done(match last_error() {
                Some(err) => Err(err),
                None => Reflect::get(&result, &lookup),
            });
        }
    });

    if let Err(e) = chrome_storage_get(key, callback.unchecked_ref()) {
        if let Some(done) = on_done.borrow_mut().take() {
            done(Err(e));
        }
    }
}

/// `chrome.storage.local.set` as a promise resolving to `true`.
///
/// Rejects with `chrome.runtime.lastError` unchanged.
#[wasm_bindgen(js_name = setStorage)]
pub fn set_storage_js(key: &str, value: JsValue) -> Promise {
    Promise::new(&mut |resolve: Function, reject: Function| {
        storage_set(key, &value, move |result| {
            let _ = match result {
                Ok(()) => resolve.call1(&JsValue::NULL, &JsValue::TRUE),
                Err(err) => reject.call1(&JsValue::NULL, &err),
            };
        });
    })
}

/// `chrome.storage.local.get` as a promise resolving to the stored value or `undefined`.
///
/// Rejects with `chrome.runtime.lastError` unchanged.
#[wasm_bindgen(js_name = getStorage)]
pub fn get_storage_js(key: &str) -> Promise {
    Promise::new(&mut |resolve: Function, reject: Function| {
        storage_get(key, move |result| {
            let _ = match result {
                Ok(value) => resolve.call1(&JsValue::NULL, &value),
                Err(err) => reject.call1(&JsValue::NULL, &err),
            };
        });
    })
}

/// `chrome.storage.local` as a Rust storage area.
///
/// Values cross the boundary as JSON, so anything stored here reads back
/// from JS as plain objects, arrays and primitives. A stored value JSON
/// cannot carry (a `BigInt`, a cycle) reads back as [`StorageError::Codec`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromeLocalStorage;

impl StorageArea for ChromeLocalStorage {
    type Error = JsValue;

    async fn set_item(&self, key: &str, value: Value) -> Result<(), StorageError<Self::Error>> {
        let text = serde_json::to_string(&value).map_err(|e| StorageError::<JsValue>::codec(key, e))?;
        let value = js_sys::JSON::parse(&text).map_err(|e| StorageError::<JsValue>::codec(key, js_reason(&e)))?;

        let (tx, rx) = oneshot::channel();
        storage_set(key, &value, move |result| {
            let _ = tx.send(result);
        });
        rx.await
            .map_err(|_| StorageError::Host(JsValue::from_str("chrome.storage.local.set never called back")))?
            .map_err(StorageError::Host)
    }

    async fn get_item(&self, key: &str) -> Result<Option<Value>, StorageError<Self::Error>> {
        let (tx, rx) = oneshot::channel();
        storage_get(key, move |result| {
            let _ = tx.send(result);
        });
        let value = rx
            .await
            .map_err(|_| StorageError::Host(JsValue::from_str("chrome.storage.local.get never called back")))?
            .map_err(StorageError::Host)?;

        if value.is_undefined() {
            return Ok(None);
        }
        let text: String = js_sys::JSON::stringify(&value)
            .map_err(|e| StorageError::<JsValue>::codec(key, js_reason(&e)))?
            .into();
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| StorageError::codec(key, e))
    }
}

/// Message of a thrown JS error, for codec errors.
fn js_reason(err: &JsValue) -> String {
    err.dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .unwrap_or_else(|| format!("{:?}", err))
}

// =============================================================================
// Rule Matching
// =============================================================================

/// Match one rule against a URL the caller already parsed (`url.hostname`, `url.href`).
///
/// Throws if a `REGEX` rule's pattern is invalid.
#[wasm_bindgen(js_name = matchesRule)]
pub fn matches_rule_js(host: &str, href: &str, rule_type: &str, rule: Option<String>) -> Result<bool, JsValue> {
    let item = FilterRuleItem {
        rule_type: RuleType::from_tag(rule_type),
        rule,
    };
    matches_rule(&UrlView::new(host, href), &item).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Match one rule against a URL string, parsing it first.
#[wasm_bindgen(js_name = matchesRuleForUrl)]
pub fn matches_rule_for_url(url: &str, rule_type: &str, rule: Option<String>) -> Result<bool, JsValue> {
    let parsed = url::Url::parse(url)
        .map_err(|e| JsValue::from_str(&format!("Invalid URL '{}': {}", url, e)))?;
    let item = FilterRuleItem {
        rule_type: RuleType::from_tag(rule_type),
        rule,
    };
    matches_rule(&parsed, &item).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Index of the first matching rule in an array of `{type, rule}` objects, or -1.
#[wasm_bindgen(js_name = firstMatch)]
pub fn first_match_js(host: &str, href: &str, rules: JsValue) -> Result<i32, JsValue> {
    let rules_array = js_sys::Array::from(&rules);
    let mut items = Vec::with_capacity(rules_array.length() as usize);

    for entry in rules_array.iter() {
        let rule_type = Reflect::get(&entry, &"type".into())
            .ok()
            .and_then(|value| value.as_string())
            .unwrap_or_default();
        let rule = Reflect::get(&entry, &"rule".into())
            .ok()
            .and_then(|value| value.as_string());
        items.push(FilterRuleItem {
            rule_type: RuleType::from_tag(&rule_type),
            rule,
        });
    }

    match first_match(&UrlView::new(host, href), &items) {
        Ok(Some(idx)) => Ok(idx as i32),
        Ok(None) => Ok(-1),
        Err(e) => Err(JsValue::from_str(&e.to_string())),
    }
}

#[wasm_bindgen(js_name = getRootDomain)]
pub fn get_root_domain_js(host: &str) -> String {
    root_domain_of_host(host).to_string()
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    #[wasm_bindgen_test]
    fn test_matches_rule_js() {
        let host = "www.example.com";
        let href = "https://www.example.com/path";
        assert!(matches_rule_js(host, href, "DOMAIN-SUFFIX", Some("example.com".into())).unwrap());
        assert!(!matches_rule_js(host, href, "DOMAIN", Some("example.com".into())).unwrap());
        assert!(!matches_rule_js(host, href, "DOMAIN", None).unwrap());
        assert!(!matches_rule_js(host, href, "BOGUS", Some("x".into())).unwrap());
        assert!(matches_rule_js(host, href, "REGEX", Some("(broken".into())).is_err());
    }

    #[wasm_bindgen_test]
    fn test_matches_rule_for_url() {
        assert!(matches_rule_for_url("https://mail.google.com/mail/u/0/", "REGEX", Some(r"https?://mail\.google\.com/".into())).unwrap());
        assert!(matches_rule_for_url("not a url", "DOMAIN", Some("x".into())).is_err());
    }

    #[wasm_bindgen_test]
    fn test_first_match_js() {
        let rules = js_sys::Array::new();
        for (rule_type, rule) in [("DOMAIN", "example.com"), ("DOMAIN-KEYWORD", "example")] {
            let obj = Object::new();
            let _ = Reflect::set(&obj, &"type".into(), &JsValue::from_str(rule_type));
            let _ = Reflect::set(&obj, &"rule".into(), &JsValue::from_str(rule));
            rules.push(&obj);
        }
        let idx = first_match_js("www.example.com", "https://www.example.com/", rules.into()).unwrap();
        assert_eq!(idx, 1);
    }

    /// Install a minimal in-page `chrome.storage.local` for the storage tests.
    fn install_fake_chrome() {
        let _ = js_sys::eval(
            r#"(() => {
                const data = {};
                globalThis.chrome = {
                    runtime: {},
                    storage: { local: {
                        set: (items, cb) => { Object.assign(data, items); cb(); },
                        get: (key, cb) => cb(key in data ? { [key]: data[key] } : {}),
                    } },
                };
            })()"#,
        );
    }

    #[wasm_bindgen_test]
    async fn test_chrome_storage_round_trip() {
        install_fake_chrome();
        let store = ChromeLocalStorage;
        let rules = vec![FilterRuleItem::new(RuleType::DomainSuffix, "example.com")];

        sf_core::set_storage(&store, "rules", &rules).await.unwrap();
        let loaded: Option<Vec<FilterRuleItem>> = sf_core::get_storage(&store, "rules").await.unwrap();
        assert_eq!(loaded, Some(rules));

        let absent: Option<String> = sf_core::get_storage(&store, "missing").await.unwrap();
        assert_eq!(absent, None);
    }

    #[wasm_bindgen_test]
    async fn test_chrome_storage_bigint_is_codec_error() {
        install_fake_chrome();
        let _ = js_sys::eval("chrome.storage.local.set({ big: 10n }, () => {})");

        let result = sf_core::get_storage::<_, Value>(&ChromeLocalStorage, "big").await;
        assert!(matches!(result, Err(StorageError::Codec { ref key, .. }) if key == "big"));
    }

    #[wasm_bindgen_test]
    fn test_get_root_domain_js() {
        assert_eq!(get_root_domain_js("mail.google.com"), "google.com");
        assert_eq!(get_root_domain_js("localhost"), "localhost");
    }
}
