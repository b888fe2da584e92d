//! In-memory model of the Car'raoke landing page

use std::time::Duration;

use pagecheck::document::fixture::{FixtureNode, FixturePage, FixtureProvider};

/// Page variations used to provoke failures
#[derive(Debug, Clone, Copy)]
pub struct LandingOptions {
    /// Include the `#how` section the nav link points to
    pub how_section: bool,
    /// Include `button.cta` elements
    pub cta_buttons: bool,
    /// The sticky CTA only appears once scrolled past the hero and settled
    pub sticky_after_scroll: bool,
}

impl Default for LandingOptions {
    fn default() -> Self {
        Self {
            how_section: true,
            cta_buttons: true,
            sticky_after_scroll: false,
        }
    }
}

/// How long the sticky CTA's reveal transition takes
pub const STICKY_SETTLE: Duration = Duration::from_millis(300);

fn h3(text: &str) -> FixtureNode {
    FixtureNode::new("h3").text(text)
}

pub fn landing_page(options: LandingOptions) -> FixturePage {
    let header = FixtureNode::new("header").height(80).child(
        FixtureNode::new("div").class("container").children([
            FixtureNode::new("img")
                .attr("src", "/logo.svg")
                .attr("alt", "Let's Car'raoke logo"),
            FixtureNode::new("nav").children([
                FixtureNode::new("a").attr("href", "#how").text("How it works"),
                FixtureNode::new("a").attr("href", "#gallery").text("Gallery"),
                FixtureNode::new("a").attr("href", "#contact").text("Contact"),
            ]),
        ]),
    );

    let mut hero = FixtureNode::new("section").id("hero").height(600).children([
        FixtureNode::new("h1").text("A staycation that makes your vacation to feel alive"),
        FixtureNode::new("p").text("Staycation energy, delivered to your driveway."),
    ]);
    if options.cta_buttons {
        hero = hero.child(FixtureNode::new("button").class("cta").text("Book Now"));
    } else {
        hero = hero.child(FixtureNode::new("a").class("button").text("Book Now"));
    }

    let how_id = if options.how_section { "how" } else { "steps" };
    let how = FixtureNode::new("section")
        .id(how_id)
        .height(500)
        .reveal_on_target()
        .children([
            FixtureNode::new("h2").text("How it works"),
            h3("Pick a Time"),
            h3("Gather Your People"),
            h3("Roll & Sing"),
        ]);

    let benefits = FixtureNode::new("section").id("benefits").height(500).children([
        FixtureNode::new("h2").text("Show up and shine"),
        h3("We Come to You"),
        h3("Pro Sound & Lights"),
        h3("Massive Song Library"),
    ]);

    let gallery = FixtureNode::new("section").id("gallery").height(400).children([
        FixtureNode::new("p").class("quote").text("Best birthday ever."),
        FixtureNode::new("p").class("quote").text("The kids still sing about it."),
    ]);

    let contact = FixtureNode::new("section")
        .id("contact")
        .height(400)
        .child(FixtureNode::new("a").attr("href", "mailto:hi@carraoke.test").text("Email us"));

    let footer = FixtureNode::new("footer")
        .height(200)
        .text("© Let's Car'raoke · San Diego, CA");

    let mut sticky = FixtureNode::new("a").class("sticky-cta").attr("href", "#contact").text("Book Now");
    if options.sticky_after_scroll {
        sticky = sticky.reveal_after_scroll(1000, STICKY_SETTLE);
    }

    FixturePage::new([
        header,
        FixtureNode::new("main").children([hero, how, benefits, gallery, contact]),
        footer,
        sticky,
    ])
}

pub fn provider(options: LandingOptions) -> FixtureProvider {
    FixtureProvider::new()
        .with_viewport_height(720)
        .with_page("/", landing_page(options))
}

/// Static HTML equivalent of the default fixture, for browser tests
pub const LANDING_HTML: &str = r##"<!doctype html>
<html>
<head>
  <title>Let's Car'raoke</title>
  <style>
    section { min-height: 400px; }
    #how { display: none; }
    #how:target { display: block; }
    .sticky-cta { position: fixed; bottom: 16px; right: 16px; }
  </style>
</head>
<body>
  <header>
    <div class="container">
      <img alt="Let's Car'raoke logo" width="64" height="64"
           src="data:image/gif;base64,R0lGODlhAQABAIAAAAAAAP///yH5BAEAAAAALAAAAAABAAEAAAIBRAA7">
      <nav>
        <a href="#how">How it works</a>
        <a href="#gallery">Gallery</a>
        <a href="#contact">Contact</a>
      </nav>
    </div>
  </header>
  <main>
    <section id="hero">
      <h1>A staycation that makes your vacation to feel alive</h1>
      <p>Staycation energy, delivered to your driveway.</p>
      <button class="cta">Book Now</button>
    </section>
    <section id="how">
      <h2>How it works</h2>
      <h3>Pick a Time</h3>
      <h3>Gather Your People</h3>
      <h3>Roll &amp; Sing</h3>
    </section>
    <section id="benefits">
      <h2>Show up and shine</h2>
      <h3>We Come to You</h3>
      <h3>Pro Sound &amp; Lights</h3>
      <h3>Massive Song Library</h3>
    </section>
    <section id="gallery">
      <p class="quote">Best birthday ever.</p>
      <p class="quote">The kids still sing about it.</p>
    </section>
    <section id="contact"><a href="mailto:hi@carraoke.test">Email us</a></section>
  </main>
  <footer>&copy; Let's Car'raoke &middot; San Diego, CA</footer>
  <a class="sticky-cta" href="#contact">Book Now</a>
</body>
</html>
"##;
