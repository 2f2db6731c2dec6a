//! The `Filter` record: the core's only input type.
//!
//! Filters are produced by the parser adapter (`crate::parser`) and
//! consumed exactly once by `Compiler::add_filter`. The compiler never
//! mutates a `Filter` after receiving it.

use std::collections::HashMap;

bitflags::bitflags! {
    /// Content-type bitmask. Bit positions match the source filter
    /// language and must not be renumbered.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ContentType: u32 {
        const OTHER              = 1;
        const SCRIPT             = 1 << 1;
        const IMAGE              = 1 << 2;
        const STYLESHEET         = 1 << 3;
        const OBJECT             = 1 << 4;
        const SUBDOCUMENT        = 1 << 5;
        const DOCUMENT           = 1 << 6;
        const WEBSOCKET          = 1 << 7;
        const WEBRTC             = 1 << 8;
        const PING               = 1 << 10;
        const XMLHTTPREQUEST     = 1 << 11;
        const OBJECT_SUBREQUEST  = 1 << 12;
        const MEDIA              = 1 << 14;
        const FONT               = 1 << 15;
        const POPUP              = 0x1000_0000;
        const GENERICBLOCK       = 0x2000_0000;
        const ELEMHIDE           = 0x4000_0000;
        const GENERICHIDE        = 0x8000_0000;

        /// The set of types relevant to ordinary URL blocking/whitelisting
        /// (excludes the whitelist-only modifier bits).
        const URL_TYPES = Self::OTHER.bits()
            | Self::SCRIPT.bits()
            | Self::IMAGE.bits()
            | Self::STYLESHEET.bits()
            | Self::OBJECT.bits()
            | Self::SUBDOCUMENT.bits()
            | Self::DOCUMENT.bits()
            | Self::WEBSOCKET.bits()
            | Self::WEBRTC.bits()
            | Self::PING.bits()
            | Self::XMLHTTPREQUEST.bits()
            | Self::OBJECT_SUBREQUEST.bits()
            | Self::MEDIA.bits()
            | Self::FONT.bits()
            | Self::POPUP.bits();
    }
}

impl Default for ContentType {
    /// A filter with no explicit type options applies to every ordinary
    /// request type (the source grammar's default).
    fn default() -> Self {
        Self::URL_TYPES
    }
}

/// Third-party / first-party constraint (`$third-party` / `$~third-party`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThirdParty {
    /// No `$third-party` option present; matches either party.
    Any,
    /// `$third-party`.
    Required,
    /// `$~third-party`.
    Forbidden,
}

impl Default for ThirdParty {
    fn default() -> Self {
        ThirdParty::Any
    }
}

/// The four filter categories the compiler dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Blocking,
    Whitelist,
    ElementHide,
    ElementHideException,
}

/// Domain constraint map: host string -> whether the filter applies to it.
/// The empty-string key is the default for hosts not otherwise listed.
pub type DomainMap = HashMap<String, bool>;

/// A single parsed filter, classified but not yet lowered.
#[derive(Debug, Clone)]
pub struct Filter {
    pub kind: FilterKind,
    /// Source pattern string (Adblock Plus syntax). Absent only for
    /// element-hide variants, which use `selector` instead.
    pub pattern: Option<String>,
    pub content_type: ContentType,
    pub match_case: bool,
    pub third_party: ThirdParty,
    pub domains: DomainMap,
    /// CSS selector; present only for `ElementHide` / `ElementHideException`.
    pub selector: Option<String>,
    /// `$sitekey=...` value, if present. Its mere presence disqualifies
    /// the filter from being compiled (see `parser::parse_line`).
    pub sitekeys: Option<String>,
}

impl Filter {
    /// Construct a URL filter (blocking or whitelist).
    pub fn url(kind: FilterKind, pattern: String) -> Self {
        debug_assert!(matches!(kind, FilterKind::Blocking | FilterKind::Whitelist));
        Self {
            kind,
            pattern: Some(pattern),
            content_type: ContentType::default(),
            match_case: false,
            third_party: ThirdParty::default(),
            domains: DomainMap::default(),
            selector: None,
            sitekeys: None,
        }
    }

    /// Construct an element-hide filter (or its exception).
    pub fn element_hide(kind: FilterKind, selector: String) -> Self {
        debug_assert!(matches!(
            kind,
            FilterKind::ElementHide | FilterKind::ElementHideException
        ));
        Self {
            kind,
            pattern: None,
            content_type: ContentType::empty(),
            match_case: false,
            third_party: ThirdParty::default(),
            domains: DomainMap::default(),
            selector: Some(selector),
            sitekeys: None,
        }
    }

    /// True if the empty-key default in `domains` is `true` (the filter
    /// applies to hosts not otherwise listed).
    pub fn domains_default_included(&self) -> bool {
        self.domains.get("").copied().unwrap_or(false)
    }
}
