//! In-page evaluation scripts
//!
//! Every script returns a JSON string so the driver output can be parsed
//! without depending on how the runtime serializes objects.

/// Attribute used to tag interactive elements so they can be addressed later
pub const REF_ATTRIBUTE: &str = "data-scout-ref";

/// URL, title and visible body text
pub const PAGE_STATE_JS: &str = r#"
(() => JSON.stringify({
  url: window.location.href,
  title: document.title || '',
  text: document.body ? document.body.innerText : ''
}))()
"#;

/// Tags and lists buttons, links and input/textarea elements in DOM order.
///
/// Tags are reassigned on every call; a locator is only valid for the page
/// state it was read from.
pub const INTERACTIVE_ELEMENTS_JS: &str = r#"
(() => {
  const ATTR = 'data-scout-ref';
  function isVisible(el) {
    const s = window.getComputedStyle(el);
    if (s.display === 'none' || s.visibility === 'hidden' || s.opacity === '0') return false;
    const r = el.getBoundingClientRect();
    return r.width > 0 && r.height > 0;
  }
  function attr(el, name) {
    const v = el.getAttribute(name);
    return v === null ? undefined : v;
  }
  function describe(el, prefix, index) {
    const ref = prefix + index;
    el.setAttribute(ATTR, ref);
    const tag = el.tagName.toLowerCase();
    return {
      locator: '[' + ATTR + '="' + ref + '"]',
      tag: tag,
      visible: isVisible(el),
      text: (el.innerText || el.textContent || '').trim().slice(0, 120),
      id: el.id || undefined,
      name: attr(el, 'name'),
      placeholder: attr(el, 'placeholder'),
      href: tag === 'a' ? attr(el, 'href') : undefined,
      input_type: tag === 'input' ? (el.type || 'text') : undefined,
      value: tag === 'input' ? (el.value || undefined) : undefined,
      disabled: !!el.disabled
    };
  }
  const buttons = [...document.querySelectorAll('button')].map((el, i) => describe(el, 'b', i));
  const links = [...document.querySelectorAll('a[href]')].map((el, i) => describe(el, 'a', i));
  const inputs = [...document.querySelectorAll('input, textarea')].map((el, i) => describe(el, 'i', i));
  return JSON.stringify({ buttons, links, inputs });
})()
"#;

/// Installs a console shim that buffers messages in `window.__scoutConsole`.
/// Idempotent per document; must be re-run after every navigation.
pub const CONSOLE_CAPTURE_JS: &str = r#"
(() => {
  if (window.__scoutConsoleInstalled) return JSON.stringify(false);
  window.__scoutConsoleInstalled = true;
  window.__scoutConsole = [];
  function push(level, args) {
    const text = Array.from(args).map(a => {
      if (typeof a === 'object') { try { return JSON.stringify(a); } catch (e) { return String(a); } }
      return String(a);
    }).join(' ');
    window.__scoutConsole.push({ level: level, text: text, location: window.location.href });
    if (window.__scoutConsole.length > 500) window.__scoutConsole.shift();
  }
  for (const level of ['log', 'debug', 'info', 'warn', 'error']) {
    const original = console[level];
    console[level] = function (...args) { push(level, args); original.apply(console, args); };
  }
  window.addEventListener('error', e => push('error', ['Uncaught ' + (e.error || e.message)]));
  window.addEventListener('unhandledrejection', e => push('error', ['Unhandled rejection: ' + e.reason]));
  return JSON.stringify(true);
})()
"#;

/// Returns and clears the buffered console messages
pub const CONSOLE_DRAIN_JS: &str = r#"
(() => {
  const entries = window.__scoutConsole || [];
  window.__scoutConsole = [];
  return JSON.stringify(entries);
})()
"#;

/// Outline an element before interacting with it
pub fn highlight_js(selector: &str) -> String {
    // serde_json produces a valid JS string literal
    let quoted = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
    format!(
        r#"(() => {{
  const el = document.querySelector({});
  if (el) {{ el.style.outline = '2px solid red'; el.style.backgroundColor = 'rgba(255, 0, 0, 0.1)'; }}
  return JSON.stringify(!!el);
}})()"#,
        quoted
    )
}
