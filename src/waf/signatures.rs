use once_cell::sync::Lazy;
use regex::Regex;

/// Where a rule looks for its pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Value of every response header with this name (ASCII case-insensitive).
    Header(String),
    Body,
}

#[derive(Debug, Clone)]
enum Matcher {
    Regex(Regex),
    Literal,
}

/// A single WAF fingerprint: a pattern that, when found, names the WAF.
#[derive(Debug, Clone)]
pub struct Rule {
    scope: Scope,
    pattern: String,
    label: String,
    matcher: Matcher,
}

impl Rule {
    /// Header rule. `pattern` is a regex searched (case-sensitively) in the header value.
    pub fn header(name: &str, pattern: &str, label: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            scope: Scope::Header(name.to_string()),
            pattern: pattern.to_string(),
            label: label.to_string(),
            matcher: Matcher::Regex(Regex::new(pattern)?),
        })
    }

    /// Body rule. `pattern` is matched as a literal substring.
    pub fn body(pattern: &str, label: &str) -> Self {
        Self {
            scope: Scope::Body,
            pattern: pattern.to_string(),
            label: label.to_string(),
            matcher: Matcher::Literal,
        }
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Does this rule fire on the given response header?
    pub fn matches_header(&self, name: &str, value: &str) -> bool {
        match &self.scope {
            Scope::Header(key) => key.eq_ignore_ascii_case(name) && self.matches_value(value),
            Scope::Body => false,
        }
    }

    /// Regex search over a header value the caller already picked by name.
    pub fn matches_value(&self, value: &str) -> bool {
        match &self.matcher {
            Matcher::Regex(re) => re.is_match(value),
            Matcher::Literal => false,
        }
    }

    pub fn matches_body(&self, body: &str) -> bool {
        match self.scope {
            Scope::Body => body.contains(self.pattern.as_str()),
            Scope::Header(_) => false,
        }
    }
}

/// Immutable, ordered catalog of WAF rules.
///
/// Header rules are always consulted before body rules; within a group the
/// catalog order decides which rule wins.
#[derive(Debug, Clone, Default)]
pub struct SignatureStore {
    header_rules: Vec<Rule>,
    body_rules: Vec<Rule>,
}

impl SignatureStore {
    /// Partition `rules` by scope, keeping their relative order.
    pub fn new(rules: impl IntoIterator<Item = Rule>) -> Self {
        let (header_rules, body_rules): (Vec<Rule>, Vec<Rule>) = rules
            .into_iter()
            .partition(|r| matches!(r.scope, Scope::Header(_)));
        Self { header_rules, body_rules }
    }

    /// Process-wide catalog of known WAF fingerprints.
    pub fn builtin() -> &'static SignatureStore {
        &BUILTIN
    }

    pub fn header_rules(&self) -> &[Rule] {
        &self.header_rules
    }

    pub fn body_rules(&self) -> &[Rule] {
        &self.body_rules
    }

    pub fn len(&self) -> usize {
        self.header_rules.len() + self.body_rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

static BUILTIN: Lazy<SignatureStore> =
    Lazy::new(|| load_signatures().expect("built-in WAF signatures must compile"));

// Header name, value regex, label. An empty regex flags the header's mere presence.
const HEADER_SIGNATURES: &[(&str, &str, &str)] = &[
    ("X-BinarySec-NoCache", "", "BinarySec"),
    ("nnCoection", "", "NetScaler"),
    ("Cneonction", "", "NetScaler"),
    ("X-CNection", "", "BigIP"),
    ("Set-Cookie", "^barra_counter=", "Barracuda"),
    ("Set-Cookie", "^sessioncookie=", "Denyall"),
    ("Set-Cookie", "^NSC_", "NetScaler"),
    ("Set-Cookie", "^AL_LB=", "Airlock"),
    ("Set-Cookie", "^AL_SESS=", "Airlock"),
    ("Set-Cookie", "^ASINFO=", "F5 Traffic Shield"),
    ("Set-Cookie", "^st8id=", "Teros / Citrix Application Firewall Enterprise"),
    ("Set-Cookie", "^st8_wlf=", "Teros / Citrix Application Firewall Enterprise"),
    ("Set-Cookie", "^st8_wat=", "Teros / Citrix Application Firewall Enterprise"),
    ("Set-Cookie", "^PLBSID=", "Profense"),
    ("Server", "^BigIP$", "BigIP"),
    ("Server", "^F5-TrafficShield$", "F5 Traffic Shield"),
    ("Server", "WebKnight", "WebKnight"),
    ("Server", "BinarySec", "BinarySec"),
    ("Server", "Profense", "Profense"),
    // Case-insensitive: Cloudflare edges send `Server: cloudflare`.
    ("Server", "(?i)cloudflare", "Cloudflare"),
    ("Server", "^awselb/", "AWS ELB"),
];

const BODY_SIGNATURES: &[(&str, &str)] = &[
    ("A potentially unsafe operation has been detected in your request to this site.", "WordFence"),
    ("Generated by Wordfence at", "WordFence"),
    ("Request unsuccessful. Incapsula incident ID", "Imperva Incapsula"),
    ("You don't have permission to access ", "Akamai"),
    ("The server denied the specified Uniform Resource Locator", "ISA Server"),
    ("The ISA Server denied the specified Uniform Resource Locator", "ISA Server"),
    ("The requested URL was rejected. Please consult with your administrator.", "F5 ASM or NetScaler"),
    ("Your support ID is: ", "F5 ASM or NetScaler"),
    ("This website is using a security service to protect itself from online attacks.", "Cloudflare"),
    ("ERROR: The request could not be satisfied", "Cloudflare"),
];

/// Compile the built-in fingerprint table.
pub fn load_signatures() -> Result<SignatureStore, regex::Error> {
    let mut rules = Vec::with_capacity(HEADER_SIGNATURES.len() + BODY_SIGNATURES.len());
    for (name, pattern, label) in HEADER_SIGNATURES {
        rules.push(Rule::header(name, pattern, label)?);
    }
    rules.extend(BODY_SIGNATURES.iter().map(|(pattern, label)| Rule::body(pattern, label)));
    Ok(SignatureStore::new(rules))
}
