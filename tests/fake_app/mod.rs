//! In-process stand-in for the admin web application
//!
//! Renders the login page and the admin area as real markup and resolves
//! locators the way a browser does: XPath queries go through an XPath 1.0
//! engine and CSS selectors through an HTML parser, so the queries built by
//! [`Locator::to_query`] are exercised as written.
//!
//! Sign-in is asynchronous like the real auth backend: clicking "Sign In"
//! starts a request that completes after `sign_in_delay`, and a full
//! navigation before then aborts it. Every session is isolated; sign-in
//! state lives in the session, never in the shared backend.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use gatecheck::browser::{BrowserSession, Interaction, SessionFactory, Visibility};
use gatecheck::scenario::{Locator, Query};
use gatecheck::{Error, Result};

pub const OWNER_EMAIL: &str = "teforamokate48@gmail.com";

/// Registered accounts: (email, password)
const ACCOUNTS: &[(&str, &str)] = &[
    (OWNER_EMAIL, OWNER_EMAIL),
    ("editor@example.com", "editor-password"),
];

/// Elements whose content is never displayed
const UNRENDERED_TAGS: &[&str] = &["head", "title", "script", "style", "noscript", "template"];

/// Counters shared by every session of one fake app
#[derive(Default)]
pub struct Stats {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
}

/// Session factory for the fake app
#[derive(Clone)]
pub struct FakeApp {
    pub stats: Arc<Stats>,
    /// Time between navigation and the page content appearing
    pub render_delay: Duration,
    /// Time the auth backend takes to answer sign-in and sign-out
    pub auth_delay: Duration,
    /// Navigating to this path never completes
    pub hang_on: Option<&'static str>,
    /// Make `close` report an error (the session is still counted as closed)
    pub fail_close: bool,
    /// Make `open` fail
    pub refuse_sessions: bool,
    /// Broken owner check that ignores letter case
    pub case_insensitive_guard: bool,
}

impl FakeApp {
    pub fn new() -> Self {
        Self {
            stats: Arc::new(Stats::default()),
            render_delay: Duration::ZERO,
            auth_delay: Duration::from_millis(50),
            hang_on: None,
            fail_close: false,
            refuse_sessions: false,
            case_insensitive_guard: false,
        }
    }

    pub fn opened(&self) -> usize {
        self.stats.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.stats.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for FakeApp {
    async fn open(&self) -> Result<Box<dyn BrowserSession>> {
        if self.refuse_sessions {
            return Err(Error::SessionStart("session not created: no browser".into()));
        }
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeBrowser {
            app: self.clone(),
            path: "about:blank".to_string(),
            rendered_at: Instant::now(),
            signed_in_as: None,
            form: LoginForm::default(),
            pending: None,
        }))
    }
}

/// State of the login page component; reset whenever a route mounts
#[derive(Default)]
struct LoginForm {
    email: String,
    password: String,
    error: Option<String>,
    success: Option<String>,
}

/// A sign-in request waiting on the auth backend
struct PendingSignIn {
    email: String,
    password: String,
    done_at: Instant,
}

/// One isolated browser session against the fake app
pub struct FakeBrowser {
    app: FakeApp,
    path: String,
    rendered_at: Instant,
    /// Email of the signed-in account, exactly as typed at login
    signed_in_as: Option<String>,
    form: LoginForm,
    pending: Option<PendingSignIn>,
}

/// What a query matched, as far as the fake app cares
#[derive(Debug)]
struct Found {
    tag: String,
    input_type: Option<String>,
    href: Option<String>,
    action: Option<String>,
    displayed: bool,
}

impl FakeBrowser {
    /// Client-side route change: the new page component mounts fresh
    fn go(&mut self, path: &str) {
        self.path = path.to_string();
        self.rendered_at = Instant::now();
        self.form = LoginForm::default();
    }

    fn is_admin(&self) -> bool {
        match &self.signed_in_as {
            Some(email) if self.app.case_insensitive_guard => email.eq_ignore_ascii_case(OWNER_EMAIL),
            Some(email) => email == OWNER_EMAIL,
            None => false,
        }
    }

    /// Apply whatever the backend has answered by now
    fn settle(&mut self) {
        let answered = self
            .pending
            .as_ref()
            .is_some_and(|p| Instant::now() >= p.done_at);
        if answered {
            if let Some(request) = self.pending.take() {
                self.finish_sign_in(request);
            }
        }

        if self.path == "/logout" && self.rendered_at.elapsed() >= self.app.auth_delay {
            self.signed_in_as = None;
            self.go("/login");
        }
    }

    fn finish_sign_in(&mut self, request: PendingSignIn) {
        // Account lookup ignores case like most auth backends; the admin
        // check downstream does not.
        let known = ACCOUNTS.iter().any(|(email, password)| {
            email.eq_ignore_ascii_case(&request.email) && *password == request.password
        });
        if known {
            self.signed_in_as = Some(request.email);
            self.go("/admin");
        } else if self.path == "/login" {
            self.form.error = Some("Invalid login credentials".into());
        }
    }

    fn start_sign_in(&mut self) {
        self.form.error = None;
        self.form.success = None;
        if self.form.email.is_empty() || self.form.password.is_empty() {
            self.form.error = Some("Enter email and password".into());
            return;
        }
        self.pending = Some(PendingSignIn {
            email: self.form.email.clone(),
            password: self.form.password.clone(),
            done_at: Instant::now() + self.app.auth_delay,
        });
    }

    fn render(&self) -> String {
        let path = self.path.as_str();
        let admin_area = path == "/admin" || path.starts_with("/admin/");
        let title = if admin_area {
            "Admin | FrameCanvas"
        } else if path == "/login" {
            "Sign In | FrameCanvas"
        } else {
            "FrameCanvas"
        };

        let body = if self.rendered_at.elapsed() < self.app.render_delay {
            "<div>Checking access…</div>".to_string()
        } else if admin_area {
            self.render_admin(path)
        } else if path == "/login" {
            format!("{}{}", PUBLIC_HEADER, self.render_login())
        } else if path == "/logout" {
            "<div>Signing out…</div>".to_string()
        } else {
            format!("{}<main><div>Templates gallery</div></main>", PUBLIC_HEADER)
        };

        format!(
            "<html><head><title>{title}</title><script>window.__title = \"{title}\";</script></head>\
             <body><noscript>You need to enable JavaScript to run this app.</noscript>\
             <div id=\"root\">{body}</div></body></html>"
        )
    }

    fn render_login(&self) -> String {
        let mut html = String::from("<main><div class=\"card\"><div>Sign In</div>");
        if let Some(error) = &self.form.error {
            html.push_str(&format!("<div class=\"error\">{}</div>", error));
        }
        if let Some(success) = &self.form.success {
            html.push_str(&format!("<div class=\"success\">{}</div>", success));
        }
        html.push_str(
            "<input type=\"email\" placeholder=\"Email\" />\
             <input type=\"password\" placeholder=\"Password\" />\
             <div>\
               <button data-action=\"sign-in\">Sign In</button>\
               <button data-action=\"toggle-mode\">Create Account</button>\
               <button data-action=\"sign-out\">Sign Out</button>\
             </div>\
             <div>After signing in, visit /admin</div>\
             </div></main>",
        );
        html
    }

    fn render_admin(&self, path: &str) -> String {
        if !self.is_admin() {
            return "<main><div class=\"error\">Access denied</div></main>".to_string();
        }
        let page = match path {
            "/admin" => {
                "<a href=\"/admin/templates\"><div>Template Management</div>\
                   <div>Upload and manage template versions and previews</div></a>\
                 <a href=\"/admin/analytics\"><div>Analytics</div>\
                   <div>Downloads and engagement</div></a>\
                 <a href=\"/admin/settings\"><div>Settings</div>\
                   <div>Limits, CDN, and configuration</div></a>"
            }
            "/admin/templates" => {
                "<div>Upload Template</div><input type=\"text\" placeholder=\"Title\" />"
            }
            "/admin/analytics" => "<div>Analytics</div><div>Total downloads</div><div>0</div>",
            "/admin/settings" => {
                "<div>Settings</div><div>Template size limit: 50MB</div>\
                 <div>CDN: enabled for public media</div>"
            }
            _ => "<div>Not found</div>",
        };
        format!(
            "<header><div><a href=\"/admin\">Admin</a><nav>\
               <a href=\"/admin/templates\">Templates</a>\
               <a href=\"/admin/analytics\">Analytics</a>\
               <a href=\"/admin/settings\">Settings</a>\
               <button data-action=\"logout\">Logout</button>\
             </nav></div></header><main>{page}</main>"
        )
    }

    fn find(&self, locator: &Locator) -> Result<Option<Found>> {
        let page = self.render();
        match locator.to_query() {
            Query::XPath(xpath) => find_xpath(&page, &xpath, locator.nth),
            Query::Css(css) => find_css(&page, &css, locator.nth),
        }
    }
}

const PUBLIC_HEADER: &str = "<header><a href=\"/\"><span>FrameCanvas</span></a>\
    <input type=\"search\" placeholder=\"Search templates...\" />\
    <nav><a href=\"/templates\">Browse</a><a href=\"/templates\"><button>Get Started</button></a></nav>\
    </header>";

fn find_xpath(page: &str, xpath: &str, nth: usize) -> Result<Option<Found>> {
    use sxd_document::dom::{Element, ParentOfChild};
    use sxd_xpath::nodeset::Node;

    fn displayed(element: Element) -> bool {
        let mut current = Some(element);
        while let Some(e) = current {
            if UNRENDERED_TAGS.contains(&e.name().local_part()) || e.attribute_value("hidden").is_some() {
                return false;
            }
            current = match e.parent() {
                Some(ParentOfChild::Element(parent)) => Some(parent),
                _ => None,
            };
        }
        true
    }

    let package = sxd_document::parser::parse(page)
        .map_err(|e| Error::Internal(format!("fake page is not well-formed: {:?}", e)))?;
    let document = package.as_document();
    let value = sxd_xpath::evaluate_xpath(&document, xpath)
        .map_err(|e| Error::Driver(format!("invalid selector {}: {:?}", xpath, e)))?;
    let sxd_xpath::Value::Nodeset(nodes) = value else {
        return Err(Error::Driver(format!("invalid selector {}: not a node set", xpath)));
    };

    let element = nodes
        .document_order()
        .into_iter()
        .filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
        .nth(nth);
    Ok(element.map(|e| Found {
        tag: e.name().local_part().to_string(),
        input_type: e.attribute_value("type").map(str::to_string),
        href: e.attribute_value("href").map(str::to_string),
        action: e.attribute_value("data-action").map(str::to_string),
        displayed: displayed(e),
    }))
}

fn find_css(page: &str, css: &str, nth: usize) -> Result<Option<Found>> {
    let selector = scraper::Selector::parse(css)
        .map_err(|e| Error::Driver(format!("invalid selector {}: {:?}", css, e)))?;
    let document = scraper::Html::parse_document(page);

    Ok(document.select(&selector).nth(nth).map(|el| {
        let element = el.value();
        let displayed = std::iter::once(element)
            .chain(el.ancestors().filter_map(|n| n.value().as_element()))
            .all(|e| !UNRENDERED_TAGS.contains(&e.name()) && e.attr("hidden").is_none());
        Found {
            tag: element.name().to_string(),
            input_type: element.attr("type").map(str::to_string),
            href: element.attr("href").map(str::to_string),
            action: element.attr("data-action").map(str::to_string),
            displayed,
        }
    }))
}

#[async_trait]
impl BrowserSession for FakeBrowser {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let path = match url.find("://") {
            Some(scheme_end) => {
                let rest = &url[scheme_end + 3..];
                rest.find('/').map_or("/", |i| &rest[i..])
            }
            None => url,
        };
        if self.app.hang_on == Some(path) {
            std::future::pending::<()>().await;
        }
        // A full page load aborts any request still in flight
        self.pending = None;
        self.go(path);
        Ok(())
    }

    async fn ready_state(&mut self) -> Result<String> {
        Ok("complete".into())
    }

    async fn visibility(&mut self, locator: &Locator) -> Result<Visibility> {
        self.settle();
        Ok(match self.find(locator)? {
            Some(found) if found.displayed => Visibility::Visible,
            Some(_) => Visibility::Hidden,
            None => Visibility::Missing,
        })
    }

    async fn fill(&mut self, locator: &Locator, value: &str) -> Result<Interaction> {
        self.settle();
        let Some(found) = self.find(locator)? else {
            return Ok(Interaction::Missing);
        };
        if !found.displayed || found.tag != "input" {
            return Ok(Interaction::NotReady("element not interactable".into()));
        }
        match found.input_type.as_deref() {
            Some("email") => self.form.email = value.to_string(),
            Some("password") => self.form.password = value.to_string(),
            _ => {}
        }
        Ok(Interaction::Done)
    }

    async fn click(&mut self, locator: &Locator) -> Result<Interaction> {
        self.settle();
        let Some(found) = self.find(locator)? else {
            return Ok(Interaction::Missing);
        };
        if !found.displayed {
            return Ok(Interaction::NotReady("element not interactable".into()));
        }
        if let Some(href) = &found.href {
            self.go(href);
            return Ok(Interaction::Done);
        }
        match found.action.as_deref() {
            Some("sign-in") => self.start_sign_in(),
            Some("sign-out") => {
                self.signed_in_as = None;
                self.form.error = None;
                self.form.success = Some("Signed out".into());
            }
            Some("logout") => {
                self.signed_in_as = None;
                self.go("/login");
            }
            _ => {}
        }
        Ok(Interaction::Done)
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok(format!("http://fake.test{}", self.path))
    }

    async fn close(&mut self) -> Result<()> {
        self.app.stats.closed.fetch_add(1, Ordering::SeqCst);
        if self.app.fail_close {
            return Err(Error::Driver("invalid session id".into()));
        }
        Ok(())
    }
}
