//! Event vocabulary shared by the event bridge and render engines.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// Payload delivered to event handlers.
pub type EventPayload = serde_json::Value;

macro_rules! chart_events {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Engine event name.
        ///
        /// Known engine events are closed variants; anything else travels
        /// through `Custom` so newer engine events stay reachable.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum ChartEvent {
            $($variant,)+
            Custom(String),
        }

        impl ChartEvent {
            #[must_use]
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $name,)+
                    Self::Custom(name) => name,
                }
            }

            #[must_use]
            pub fn is_known(&self) -> bool {
                !matches!(self, Self::Custom(_))
            }
        }

        impl From<&str> for ChartEvent {
            fn from(name: &str) -> Self {
                match name {
                    $($name => Self::$variant,)+
                    other => Self::Custom(other.to_owned()),
                }
            }
        }
    };
}

chart_events! {
    Click => "click",
    DblClick => "dblclick",
    MouseDown => "mousedown",
    MouseMove => "mousemove",
    MouseUp => "mouseup",
    MouseOver => "mouseover",
    MouseOut => "mouseout",
    GlobalOut => "globalout",
    ContextMenu => "contextmenu",
    Highlight => "highlight",
    Downplay => "downplay",
    SelectChanged => "selectchanged",
    LegendSelectChanged => "legendselectchanged",
    LegendScroll => "legendscroll",
    DataZoom => "datazoom",
    DataRangeSelected => "datarangeselected",
    TimelineChanged => "timelinechanged",
    Restore => "restore",
    BrushSelected => "brushselected",
    GlobalCursorTaken => "globalcursortaken",
    Rendered => "rendered",
    Finished => "finished",
}

impl From<String> for ChartEvent {
    fn from(name: String) -> Self {
        let event = Self::from(name.as_str());
        match event {
            Self::Custom(_) => Self::Custom(name),
            known => known,
        }
    }
}

impl From<ChartEvent> for String {
    fn from(event: ChartEvent) -> Self {
        match event {
            ChartEvent::Custom(name) => name,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for ChartEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference-counted event handler.
///
/// Equality is identity: two handlers are equal only when they share the
/// same allocation, which is how `off` finds the registration to remove.
#[derive(Clone)]
pub struct EventHandler(Rc<dyn Fn(&EventPayload)>);

impl EventHandler {
    pub fn new(handler: impl Fn(&EventPayload) + 'static) -> Self {
        Self(Rc::new(handler))
    }

    pub fn call(&self, payload: &EventPayload) {
        (self.0)(payload);
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHandler({:p})", Rc::as_ptr(&self.0).cast::<()>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_map_to_closed_variants() {
        assert_eq!(ChartEvent::from("click"), ChartEvent::Click);
        assert_eq!(ChartEvent::from("finished").as_str(), "finished");
        assert_eq!(
            ChartEvent::from("graphroam"),
            ChartEvent::Custom("graphroam".to_owned())
        );
        assert!(!ChartEvent::from("graphroam").is_known());
    }

    #[test]
    fn handler_equality_is_identity() {
        let a = EventHandler::new(|_| {});
        let b = EventHandler::new(|_| {});
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
