//! JavaScript snippets sent over the automation channel.
//!
//! Each snippet is a function body: positional arguments arrive as `arguments[n]` and the
//! result is `return`ed. Element snippets run with `this` bound to the element.

pub const GET_SCROLL_POSITION: &str = r#"
    var doc = document.documentElement;
    var x = window.scrollX || ((window.pageXOffset || doc.scrollLeft) - (doc.clientLeft || 0));
    var y = window.scrollY || ((window.pageYOffset || doc.scrollTop) - (doc.clientTop || 0));
    return [Math.round(x), Math.round(y)];
"#;

pub const SCROLL_TO: &str = "window.scrollTo(arguments[0], arguments[1]);";

pub const GET_ENTIRE_SIZE: &str = r#"
    var doc = document.documentElement;
    var body = document.body || doc;
    var totalWidth = Math.max(doc.scrollWidth, body.scrollWidth);
    var totalHeight = Math.max(doc.scrollHeight, body.scrollHeight);
    return [totalWidth, totalHeight];
"#;

pub const GET_VIEWPORT_SIZE: &str = r#"
    var height = undefined;
    var width = undefined;
    if (window.innerHeight) {
        height = window.innerHeight;
    } else if (document.documentElement && document.documentElement.clientHeight) {
        height = document.documentElement.clientHeight;
    } else {
        var b = document.getElementsByTagName('body')[0];
        if (b.clientHeight) { height = b.clientHeight; }
    }
    if (window.innerWidth) {
        width = window.innerWidth;
    } else if (document.documentElement && document.documentElement.clientWidth) {
        width = document.documentElement.clientWidth;
    } else {
        var b = document.getElementsByTagName('body')[0];
        if (b.clientWidth) { width = b.clientWidth; }
    }
    return [width, height];
"#;

pub const GET_DEVICE_PIXEL_RATIO: &str = "return window.devicePixelRatio;";

pub const GET_USER_AGENT: &str = "return navigator.userAgent;";

pub const GET_TRANSFORMS: &str = r#"
    var style = document.documentElement.style;
    return { transform: style.transform || '', webkitTransform: style.webkitTransform || '' };
"#;

pub const SET_TRANSFORM: &str = r#"
    var style = document.documentElement.style;
    style.transform = arguments[0];
    style.webkitTransform = arguments[0];
"#;

pub const SET_TRANSFORMS: &str = r#"
    var style = document.documentElement.style;
    var transforms = arguments[0];
    for (var key in transforms) { style[key] = transforms[key]; }
"#;

/// Sets the root element's overflow and returns the previous inline value.
pub const SET_OVERFLOW: &str = r#"
    var el = document.documentElement;
    var previous = el.style.overflow || '';
    el.style.overflow = arguments[0];
    return previous;
"#;

pub const GET_OVERFLOW: &str = "return document.documentElement.style.overflow || '';";

pub const ELEMENT_SCROLL_POSITION: &str = "return [this.scrollLeft, this.scrollTop];";

pub const ELEMENT_SCROLL_TO: &str = r#"
    this.scrollLeft = arguments[0];
    this.scrollTop = arguments[1];
"#;

pub const ELEMENT_SCROLL_SIZE: &str = "return [this.scrollWidth, this.scrollHeight];";

/// Bounds in the element's own document coordinates.
pub const ELEMENT_BOUNDS: &str = r#"
    var win = this.ownerDocument.defaultView;
    var rect = this.getBoundingClientRect();
    return {
        left: Math.round(rect.left + win.scrollX),
        top: Math.round(rect.top + win.scrollY),
        width: Math.round(rect.width),
        height: Math.round(rect.height),
        clientLeft: this.clientLeft,
        clientTop: this.clientTop,
        clientWidth: this.clientWidth,
        clientHeight: this.clientHeight
    };
"#;

pub const ELEMENT_COMPUTED_STYLE: &str = r#"
    return this.ownerDocument.defaultView.getComputedStyle(this).getPropertyValue(arguments[0]);
"#;

pub const ELEMENT_SET_OVERFLOW: &str = r#"
    var previous = this.style.overflow || '';
    this.style.overflow = arguments[0];
    return previous;
"#;

/// Index of this iframe in its parent's `window.frames`, or -1.
pub const FRAME_INDEX: &str = r#"
    var win = this.ownerDocument.defaultView;
    for (var i = 0; i < win.frames.length; i++) {
        if (win.frames[i] === this.contentWindow) { return i; }
    }
    return -1;
"#;
