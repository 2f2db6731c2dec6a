//! Filter Parser (SPEC_FULL.md §4.8): turns one line of Adblock Plus
//! filter-list syntax into a classified `Filter`, or `None` if the
//! line is blank, a comment, a section header, or syntax the target
//! format cannot express.

use crate::filter::{ContentType, DomainMap, Filter, FilterKind, ThirdParty};

/// Parse one line. Returns `None` for anything that produces no
/// filter (comments, section headers, unsupported options, empty
/// patterns) — never an error. A malformed line is simply dropped,
/// per SPEC_FULL.md §7: no single line can abort a compile.
pub fn parse_line(line: &str) -> Option<Filter> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('!') {
        return None;
    }
    if line.starts_with('[') && line.ends_with(']') {
        return None;
    }

    if let Some((domain_part, rest, separator)) = split_element_hide(line) {
        return parse_element_hide(domain_part, rest, separator);
    }

    parse_url_filter(line)
}

enum ElemHideSeparator {
    Plain,
    Exception,
    ExtendedCss,
}

/// Locate the earliest element-hide separator in `line` and split
/// around it. `##` is checked last since it is a substring check that
/// would otherwise also match inside neither of the other two (they
/// don't contain `##`), but scanning longer separators first keeps
/// the intent obvious.
fn split_element_hide(line: &str) -> Option<(&str, &str, ElemHideSeparator)> {
    let candidates = [
        ("#@#", ElemHideSeparator::Exception),
        ("#?#", ElemHideSeparator::ExtendedCss),
        ("##", ElemHideSeparator::Plain),
    ];

    let mut best: Option<(usize, &str, &str, ElemHideSeparator)> = None;
    for (needle, kind) in candidates {
        if let Some(idx) = line.find(needle) {
            if best.as_ref().map_or(true, |(best_idx, ..)| idx < *best_idx) {
                best = Some((idx, &line[..idx], &line[idx + needle.len()..], kind));
            }
        }
    }

    best.map(|(_, domain_part, selector, kind)| (domain_part, selector, kind))
}

fn parse_element_hide(domain_part: &str, selector: &str, separator: ElemHideSeparator) -> Option<Filter> {
    // Extended CSS (`#?#`) selectors use a procedural syntax with no
    // equivalent in the target format.
    if matches!(separator, ElemHideSeparator::ExtendedCss) {
        return None;
    }
    if selector.is_empty() {
        return None;
    }

    let kind = match separator {
        ElemHideSeparator::Plain => FilterKind::ElementHide,
        ElemHideSeparator::Exception => FilterKind::ElementHideException,
        ElemHideSeparator::ExtendedCss => unreachable!(),
    };

    let mut filter = Filter::element_hide(kind, selector.to_string());
    filter.domains = parse_domain_list(domain_part, ',');
    Some(filter)
}

/// Parse a `,`- or `|`-separated domain list where a `~` prefix marks
/// exclusion, e.g. `domain1,~domain2` or `foo.com|~bar.foo.com`.
fn parse_domain_list(list: &str, separator: char) -> DomainMap {
    let mut domains = DomainMap::new();
    for part in list.split(separator) {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Some(excluded) = part.strip_prefix('~') {
            domains.insert(excluded.to_lowercase(), false);
        } else {
            domains.insert(part.to_lowercase(), true);
        }
    }
    domains
}

fn type_option_bit(name: &str) -> Option<ContentType> {
    Some(match name {
        "other" => ContentType::OTHER,
        "script" => ContentType::SCRIPT,
        "image" => ContentType::IMAGE,
        "stylesheet" => ContentType::STYLESHEET,
        "object" => ContentType::OBJECT,
        "subdocument" => ContentType::SUBDOCUMENT,
        "document" => ContentType::DOCUMENT,
        "websocket" => ContentType::WEBSOCKET,
        "webrtc" => ContentType::WEBRTC,
        "ping" => ContentType::PING,
        "xmlhttprequest" => ContentType::XMLHTTPREQUEST,
        "object-subrequest" => ContentType::OBJECT_SUBREQUEST,
        "media" => ContentType::MEDIA,
        "font" => ContentType::FONT,
        "popup" => ContentType::POPUP,
        _ => return None,
    })
}

fn parse_url_filter(line: &str) -> Option<Filter> {
    let (kind, rest) = match line.strip_prefix("@@") {
        Some(rest) => (FilterKind::Whitelist, rest),
        None => (FilterKind::Blocking, line),
    };

    let (pattern, options) = match rest.split_once('$') {
        Some((pattern, options)) => (pattern, Some(options)),
        None => (rest, None),
    };
    if pattern.is_empty() {
        return None;
    }

    let mut filter = Filter::url(kind, pattern.to_string());
    let mut positive_types = ContentType::empty();
    let mut negative_types = ContentType::empty();
    let mut saw_type_option = false;

    if let Some(options) = options {
        for option in options.split(',') {
            let option = option.trim();
            if option.is_empty() {
                continue;
            }

            if option.starts_with("sitekey=") {
                filter.sitekeys = Some(option["sitekey=".len()..].to_string());
                return None;
            }
            if option.starts_with("csp=") || option.starts_with("rewrite=") || option == "snippet"
                || option.starts_with("snippet=")
            {
                return None;
            }
            if let Some(list) = option.strip_prefix("domain=") {
                filter.domains = parse_domain_list(list, '|');
                continue;
            }
            if option == "match-case" {
                filter.match_case = true;
                continue;
            }
            if option == "third-party" {
                filter.third_party = ThirdParty::Required;
                continue;
            }
            if option == "~third-party" {
                filter.third_party = ThirdParty::Forbidden;
                continue;
            }
            if option == "elemhide" {
                filter.content_type |= ContentType::ELEMHIDE;
                continue;
            }
            if option == "generichide" {
                filter.content_type |= ContentType::GENERICHIDE;
                continue;
            }
            if option == "genericblock" {
                filter.content_type |= ContentType::GENERICBLOCK;
                continue;
            }

            let (negate, name) = match option.strip_prefix('~') {
                Some(name) => (true, name),
                None => (false, option),
            };
            match type_option_bit(name) {
                Some(bit) => {
                    saw_type_option = saw_type_option || !negate;
                    if negate {
                        negative_types |= bit;
                    } else {
                        positive_types |= bit;
                    }
                }
                None => {
                    log::debug!("ignoring unrecognized filter option: {option}");
                }
            }
        }
    }

    let base_types = if saw_type_option {
        positive_types
    } else {
        ContentType::default()
    };
    let modifier_bits = filter.content_type
        & (ContentType::ELEMHIDE | ContentType::GENERICHIDE | ContentType::GENERICBLOCK);
    filter.content_type = (base_types & !negative_types) | modifier_bits;

    Some(filter)
}
