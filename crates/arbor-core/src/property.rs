//! Applies prop differences to a live element.
//!
//! One pass removes props present before and absent now; a second applies
//! the props that differ. `value` and `checked` are written on every
//! diff regardless of equality so that external mutation of a live form
//! control is overwritten by the next render. Host refusals at the
//! attribute level are logged and skipped; the diff carries on.

use std::rc::Rc;

use log::warn;

use crate::dom::{DomError, NodeId, Namespace};
use crate::engine::Engine;
use crate::props::{PropValue, Props, StyleEntry, StyleValue};

/// Full prop diff between `old` and `new` on `node`.
pub(crate) fn write_props(
    engine: &Engine,
    node: NodeId,
    new: &Props,
    old: Option<&Props>,
    ns: Namespace,
) -> Result<(), DomError> {
    if let Some(old) = old {
        for (name, prev) in old.entries() {
            if new.get(name).is_none() {
                remove_prop(engine, node, name, prev, ns)?;
            }
        }
    }
    for (name, value) in new.entries() {
        let prev = old.and_then(|o| o.get(name));
        let force = matches!(&**name, "value" | "checked");
        let differs = match prev {
            Some(prev) => !value.same(prev),
            None => true,
        };
        if force || differs {
            set_prop(engine, node, name, value, prev, ns)?;
        }
    }
    Ok(())
}

fn set_prop(
    engine: &Engine,
    node: NodeId,
    name: &str,
    value: &PropValue,
    prev: Option<&PropValue>,
    ns: Namespace,
) -> Result<(), DomError> {
    match name {
        // Child payload and engine-level concepts are not element state.
        "children" | "key" | "ref" => Ok(()),
        "style" => match value {
            PropValue::Style(style) => {
                let prev_style = match prev {
                    Some(PropValue::Style(s)) => Some(s),
                    _ => None,
                };
                write_style(engine, node, style, prev_style)
            }
            other => {
                warn!("style prop carries {other:?}; ignored");
                Ok(())
            }
        },
        "dangerouslySetInnerHTML" => match value {
            PropValue::InnerHtml(html) => engine.dom().set_inner_html(node, html),
            other => {
                warn!("dangerouslySetInnerHTML carries {other:?}; ignored");
                Ok(())
            }
        },
        _ if is_listener_name(name) => match value {
            PropValue::Handler(handler) => {
                let event: Rc<str> = name[2..].to_ascii_lowercase().into();
                engine.set_event_handler(node, event, handler.clone())
            }
            other => {
                warn!("listener prop {name} carries {other:?}; ignored");
                Ok(())
            }
        },
        _ if matches!(value, PropValue::Opaque(_)) => Ok(()),
        _ => write_dom_prop(engine, node, name, value, ns),
    }
}

fn remove_prop(
    engine: &Engine,
    node: NodeId,
    name: &str,
    prev: &PropValue,
    _ns: Namespace,
) -> Result<(), DomError> {
    match name {
        "children" | "key" | "ref" => Ok(()),
        "style" => engine.dom().set_style_text(node, ""),
        "dangerouslySetInnerHTML" => engine.dom().set_inner_html(node, ""),
        _ if is_listener_name(name) => {
            if prev.as_handler().is_some() {
                let event = name[2..].to_ascii_lowercase();
                engine.remove_event_handler(node, &event)?;
            }
            Ok(())
        }
        _ if matches!(prev, PropValue::Opaque(_)) => Ok(()),
        "value" => engine.dom().set_property(node, "value", ""),
        "checked" => engine.dom().set_property(node, "checked", "false"),
        _ => {
            let attr = rename_attr(name);
            log_refusal(engine.dom().remove_attribute(node, attr), attr);
            Ok(())
        }
    }
}

/// Writes an ordinary prop: direct properties for form-control state on
/// HTML elements, attributes otherwise. `true` sets the empty string,
/// `false` removes.
fn write_dom_prop(
    engine: &Engine,
    node: NodeId,
    name: &str,
    value: &PropValue,
    ns: Namespace,
) -> Result<(), DomError> {
    if ns == Namespace::Html && matches!(name, "value" | "checked") {
        return engine.dom().set_property(node, name, &value.to_attr_string());
    }
    let attr = rename_attr(name);
    match value {
        PropValue::Bool(false) => {
            log_refusal(engine.dom().remove_attribute(node, attr), attr);
        }
        PropValue::Bool(true) => {
            log_refusal(engine.dom().set_attribute(node, attr, ""), attr);
        }
        _ => {
            log_refusal(
                engine.dom().set_attribute(node, attr, &value.to_attr_string()),
                attr,
            );
        }
    }
    Ok(())
}

fn log_refusal(result: Result<(), DomError>, attr: &str) {
    if let Err(error) = result {
        warn!("host refused attribute {attr}: {error}");
    }
}

fn rename_attr(name: &str) -> &str {
    match name {
        "className" => "class",
        "htmlFor" => "for",
        _ => name,
    }
}

fn is_listener_name(name: &str) -> bool {
    let mut rest = name.strip_prefix("on").unwrap_or("").chars();
    matches!(rest.next(), Some(first) if first.is_ascii_uppercase())
}

fn write_style(
    engine: &Engine,
    node: NodeId,
    new: &StyleValue,
    old: Option<&StyleValue>,
) -> Result<(), DomError> {
    match (old, new) {
        (Some(StyleValue::Text(prev)), StyleValue::Text(next)) => {
            if prev != next {
                engine.dom().set_style_text(node, next)?;
            }
            Ok(())
        }
        (_, StyleValue::Text(next)) => engine.dom().set_style_text(node, next),
        (old, StyleValue::Map(next)) => {
            // Leaving a string value behind means starting from nothing.
            let old_map = match old {
                Some(StyleValue::Map(map)) => Some(map),
                Some(StyleValue::Text(_)) => {
                    engine.dom().set_style_text(node, "")?;
                    None
                }
                None => None,
            };
            if let Some(old_map) = old_map {
                for name in old_map.keys() {
                    if !next.contains_key(name) {
                        engine.dom().remove_style_property(node, name)?;
                    }
                }
            }
            for (name, entry) in next {
                let unchanged = old_map
                    .and_then(|m| m.get(name))
                    .is_some_and(|prev| style_entry_eq(prev, entry));
                if !unchanged {
                    let css = style_entry_css(name, entry);
                    engine.dom().set_style_property(node, name, &css)?;
                }
            }
            Ok(())
        }
    }
}

fn style_entry_eq(a: &StyleEntry, b: &StyleEntry) -> bool {
    match (a, b) {
        (StyleEntry::Text(a), StyleEntry::Text(b)) => a == b,
        (StyleEntry::Number(a), StyleEntry::Number(b)) => a.to_bits() == b.to_bits(),
        _ => false,
    }
}

fn style_entry_css(name: &str, entry: &StyleEntry) -> String {
    match entry {
        StyleEntry::Text(text) => text.to_string(),
        StyleEntry::Number(n) => {
            // Custom properties (leading dash) and unitless properties take
            // the bare number; everything else gets the pixel suffix.
            if name.starts_with('-') || is_unitless(name) {
                n.to_string()
            } else {
                format!("{n}px")
            }
        }
    }
}

fn is_unitless(name: &str) -> bool {
    matches!(
        name,
        "animationIterationCount"
            | "animation-iteration-count"
            | "columnCount"
            | "column-count"
            | "fillOpacity"
            | "fill-opacity"
            | "flexGrow"
            | "flex-grow"
            | "flexShrink"
            | "flex-shrink"
            | "fontWeight"
            | "font-weight"
            | "gridColumn"
            | "grid-column"
            | "gridRow"
            | "grid-row"
            | "lineHeight"
            | "line-height"
            | "opacity"
            | "order"
            | "orphans"
            | "strokeOpacity"
            | "stroke-opacity"
            | "tabSize"
            | "tab-size"
            | "widows"
            | "zIndex"
            | "z-index"
            | "zoom"
    )
}
