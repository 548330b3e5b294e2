//! The fixed set of test categories and their report sections
//!
//! The order of `Category::ALL` is the order sections appear in the report.

use crate::record::TestOutcome;
use crate::tooltip::{self, Tooltip};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Supercookies,
    Navigation,
    Https,
    Misc,
    Fingerprinting,
    Query,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Supercookies,
        Category::Navigation,
        Category::Https,
        Category::Misc,
        Category::Fingerprinting,
        Category::Query,
    ];

    /// Key used for this category in `testResults`
    pub fn key(self) -> &'static str {
        match self {
            Category::Supercookies => "supercookies",
            Category::Navigation => "navigation",
            Category::Https => "https",
            Category::Misc => "misc",
            Category::Fingerprinting => "fingerprinting",
            Category::Query => "query",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.key() == key)
    }

    pub fn section(self) -> &'static Section {
        &SECTIONS[self as usize]
    }
}

/// CSS `word-break` applied to the test-name column of a section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordBreak {
    BreakWord,
    BreakAll,
}

impl WordBreak {
    pub fn as_css(self) -> &'static str {
        match self {
            WordBreak::BreakWord => "break-word",
            WordBreak::BreakAll => "break-all",
        }
    }
}

pub type TooltipFn = fn(&TestOutcome) -> Tooltip;

/// Static presentation data for one category
pub struct Section {
    pub category: Category,
    pub subheading: &'static str,
    pub description: &'static str,
    pub tooltip: TooltipFn,
    pub word_break: WordBreak,
}

/// Indexed by `Category as usize`
pub static SECTIONS: [Section; 6] = [
    Section {
        category: Category::Supercookies,
        subheading: "State Partitioning tests",
        description: STATE_PARTITIONING,
        tooltip: tooltip::cross_site,
        word_break: WordBreak::BreakWord,
    },
    Section {
        category: Category::Navigation,
        subheading: "Navigation tests",
        description: NAVIGATION,
        tooltip: tooltip::cross_site,
        word_break: WordBreak::BreakWord,
    },
    Section {
        category: Category::Https,
        subheading: "HTTPS tests",
        description: HTTPS,
        tooltip: tooltip::simple,
        word_break: WordBreak::BreakWord,
    },
    Section {
        category: Category::Misc,
        subheading: "Misc tests",
        description: MISC,
        tooltip: tooltip::simple,
        word_break: WordBreak::BreakWord,
    },
    Section {
        category: Category::Fingerprinting,
        subheading: "Fingerprinting resistance tests",
        description: FINGERPRINTING,
        tooltip: tooltip::fingerprinting,
        word_break: WordBreak::BreakAll,
    },
    Section {
        category: Category::Query,
        subheading: "Tracking query parameter tests",
        description: QUERY_PARAMETERS,
        tooltip: tooltip::simple,
        word_break: WordBreak::BreakWord,
    },
];

const STATE_PARTITIONING: &str = "
    A common vulnerability of web browsers is that they allow tracking companies
    to 'tag' your browser with some data ('state') that identifies you. When third-party trackers
    are embedded in websites, they can see this identifying data as you browse to different
    websites. Fortunately, it is possible for this category of leaks to be fixed by partitioning
    all data stored in the browser such that no data can be shared between websites.";

const NAVIGATION: &str = "
    When you click a hyperlink to navigate your browser from one site to another, certain
    browser APIs allow the first site to communicate to the second site. These privacy
    vulnerabilities can be fixed by introducing new limits on how much data is transfered
    between sites.";

const HTTPS: &str = "
    HTTPS is the protocol that web browsers use to connect securely to websites. When
    HTTPS is being used, the connection is encrypted so
    that third parties on the network cannot read content being sent between the
    server and your browser. In the past, insecure connections were the default and websites
    would need to actively request that a browser use HTTPS. Now the status quo is shifting,
    and browser makers are moving toward a world where HTTPS is the default protocol.";

const MISC: &str = "This category includes tests for the presence of miscellaneous privacy features.";

const FINGERPRINTING: &str = "
    Fingerprinting is a technique trackers use to uniquely identify you as you browse the web.
    A fingerprinting script will measure several characteristics of your browser and, combining
    this data, will build a fingerprint that may uniquely identify you among web users.
    Browsers can introduce countermeasures, such as minimizing the distinguishing information
    disclosed by certain web APIs so your browser is harder to pick out from the crowd
    (so-called 'fingerprinting resistance').";

const QUERY_PARAMETERS: &str = "
    When you browse from one web page to another, tracking companies will frequently attach
    a 'tracking query parameter' to the address of the second web page. That query parameter
    may contain a unique identifier that tracks you individually as you browse the web. And
    these query parameters are frequently synchronized with cookies, making them a powerful
    tracking vector. Web browsers can protect you from known tracking query parameters by
    stripping them from web addresses before your browser sends them. (The set of
    tracking query parameters tested here was largely borrowed from Brave.)";
