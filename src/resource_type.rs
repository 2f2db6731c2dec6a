//! Resource-Type Mapper (SPEC_FULL.md §4.3).
//!
//! Projects the source content-type bitmask onto the target format's
//! fixed resource-type enumeration, and determines which URL-scheme
//! prefix patterns a filter's rules must be duplicated across.

use crate::filter::ContentType;

/// One entry of the target engine's `resource_type` enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetResourceType {
    Document,
    Image,
    StyleSheet,
    Script,
    Font,
    Media,
    Popup,
    Raw,
}

impl TargetResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            TargetResourceType::Document => "document",
            TargetResourceType::Image => "image",
            TargetResourceType::StyleSheet => "style-sheet",
            TargetResourceType::Script => "script",
            TargetResourceType::Font => "font",
            TargetResourceType::Media => "media",
            TargetResourceType::Popup => "popup",
            TargetResourceType::Raw => "raw",
        }
    }
}

/// Map a content-type bitmask onto the target's resource-type set.
/// Order is deterministic (declaration order) but otherwise
/// unspecified; callers that need a stable output order should sort.
pub fn map_resource_types(content_type: ContentType) -> Vec<TargetResourceType> {
    let mut out = Vec::new();

    if content_type.contains(ContentType::SUBDOCUMENT) {
        out.push(TargetResourceType::Document);
    }
    if content_type.contains(ContentType::IMAGE) {
        out.push(TargetResourceType::Image);
    }
    if content_type.contains(ContentType::STYLESHEET) {
        out.push(TargetResourceType::StyleSheet);
    }
    if content_type.contains(ContentType::SCRIPT) {
        out.push(TargetResourceType::Script);
    }
    if content_type.contains(ContentType::FONT) {
        out.push(TargetResourceType::Font);
    }
    if content_type.intersects(ContentType::MEDIA | ContentType::OBJECT) {
        out.push(TargetResourceType::Media);
    }
    if content_type.contains(ContentType::POPUP) {
        out.push(TargetResourceType::Popup);
    }
    if content_type.intersects(
        ContentType::XMLHTTPREQUEST
            | ContentType::OBJECT_SUBREQUEST
            | ContentType::PING
            | ContentType::OTHER
            | ContentType::WEBSOCKET
            | ContentType::WEBRTC,
    ) {
        out.push(TargetResourceType::Raw);
    }

    out
}

/// One scheme family a rule may need to be duplicated across.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeFamily {
    Http,
    WebSocket,
    WebRtcStun,
    WebRtcTurn,
    Wildcard,
}

impl SchemeFamily {
    pub fn prefix(self) -> &'static str {
        match self {
            SchemeFamily::Http => "https?://",
            SchemeFamily::WebSocket => "wss?://",
            SchemeFamily::WebRtcStun => "stuns?:",
            SchemeFamily::WebRtcTurn => "turns?:",
            SchemeFamily::Wildcard => "[^:]+:(//)?",
        }
    }
}

const HTTP_TYPES: ContentType = ContentType::from_bits_truncate(
    ContentType::OTHER.bits()
        | ContentType::SCRIPT.bits()
        | ContentType::IMAGE.bits()
        | ContentType::STYLESHEET.bits()
        | ContentType::OBJECT.bits()
        | ContentType::SUBDOCUMENT.bits()
        | ContentType::DOCUMENT.bits()
        | ContentType::PING.bits()
        | ContentType::XMLHTTPREQUEST.bits()
        | ContentType::OBJECT_SUBREQUEST.bits()
        | ContentType::MEDIA.bits()
        | ContentType::FONT.bits()
        | ContentType::POPUP.bits(),
);

/// Select the minimal set of scheme prefixes a filter's content types
/// require. When WebSocket, WebRTC, and at least one HTTP-family type
/// are all requested, a single wildcard scheme covers everything and
/// no split is needed; otherwise each present family is listed
/// separately so the emitter can duplicate the rule per scheme.
pub fn select_schemes(content_type: ContentType) -> Vec<SchemeFamily> {
    let has_ws = content_type.contains(ContentType::WEBSOCKET);
    let has_webrtc = content_type.contains(ContentType::WEBRTC);
    let has_http = content_type.intersects(HTTP_TYPES);

    if has_ws && has_webrtc && has_http {
        return vec![SchemeFamily::Wildcard];
    }

    let mut out = Vec::new();
    if has_http {
        out.push(SchemeFamily::Http);
    }
    if has_ws {
        out.push(SchemeFamily::WebSocket);
    }
    if has_webrtc {
        out.push(SchemeFamily::WebRtcStun);
        out.push(SchemeFamily::WebRtcTurn);
    }
    out
}

/// The scheme prefix used while lowering the pattern itself: the
/// wildcard when it applies, else the first selected family's prefix,
/// else a plain HTTP scheme as a reasonable fallback for content types
/// with no matching scheme family (shouldn't normally arise, since
/// every source content type maps to at least one family above).
pub fn primary_scheme(content_type: ContentType) -> &'static str {
    select_schemes(content_type)
        .first()
        .map(|s| s.prefix())
        .unwrap_or_else(|| SchemeFamily::Http.prefix())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_direct_types() {
        let types = map_resource_types(
            ContentType::IMAGE | ContentType::STYLESHEET | ContentType::SCRIPT,
        );
        assert_eq!(
            types,
            vec![
                TargetResourceType::Image,
                TargetResourceType::StyleSheet,
                TargetResourceType::Script,
            ]
        );
    }

    #[test]
    fn media_and_object_collapse_to_media() {
        assert_eq!(
            map_resource_types(ContentType::MEDIA),
            vec![TargetResourceType::Media]
        );
        assert_eq!(
            map_resource_types(ContentType::OBJECT),
            vec![TargetResourceType::Media]
        );
    }

    #[test]
    fn raw_bucket_catches_misc_types() {
        assert_eq!(
            map_resource_types(ContentType::PING),
            vec![TargetResourceType::Raw]
        );
        assert_eq!(
            map_resource_types(ContentType::WEBSOCKET),
            vec![TargetResourceType::Raw]
        );
    }

    #[test]
    fn full_default_set_selects_wildcard_scheme() {
        let schemes = select_schemes(ContentType::default());
        assert_eq!(schemes, vec![SchemeFamily::Wildcard]);
    }

    #[test]
    fn websocket_only_selects_websocket_scheme() {
        let schemes = select_schemes(ContentType::WEBSOCKET);
        assert_eq!(schemes, vec![SchemeFamily::WebSocket]);
    }

    #[test]
    fn webrtc_only_selects_both_stun_and_turn() {
        let schemes = select_schemes(ContentType::WEBRTC);
        assert_eq!(
            schemes,
            vec![SchemeFamily::WebRtcStun, SchemeFamily::WebRtcTurn]
        );
    }

    #[test]
    fn websocket_with_http_but_no_webrtc_splits() {
        let schemes = select_schemes(ContentType::WEBSOCKET | ContentType::SCRIPT);
        assert_eq!(schemes, vec![SchemeFamily::Http, SchemeFamily::WebSocket]);
    }
}
