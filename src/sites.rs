//! Page layouts of the two sites. Only these two layouts are supported; a
//! redesign on either site means editing this file.

/// The listing site records are extracted from.
pub mod source {
    use crate::locator::Locator;

    /// Span holding `ID - <number>`.
    pub fn id_marker() -> Locator {
        Locator::xpath(
            "//div[contains(@class, 'sc-3e6bc6bd-19')]/div/span[contains(text(), 'ID -')]",
        )
    }

    pub fn title() -> Locator {
        Locator::css(".sc-6e54cb25-0.gDYjuA")
    }

    pub fn address() -> Locator {
        Locator::css("#address")
    }

    /// Gallery thumbnails; full-size URLs are derived from their `src`.
    pub fn images() -> Locator {
        Locator::css(".sc-1acce1b7-10.kCJmmf")
    }

    pub fn price() -> Locator {
        Locator::css("#price")
    }

    pub fn phone_reveal() -> Locator {
        Locator::xpath("//button[contains(text(), 'ნომრის ჩვენება')]")
    }

    pub fn phone() -> Locator {
        Locator::css(".sc-6e54cb25-11.kkDxQl")
    }

    pub fn name() -> Locator {
        Locator::css(".sc-6e54cb25-6.eaYTaN")
    }

    pub fn description() -> Locator {
        Locator::css(".sc-f5b2f014-2.cpLEJS")
    }

    /// One row per detail (area, rooms, floor...).
    pub fn detail_rows() -> Locator {
        Locator::css(".sc-479ccbe-0.iQgmTI .sc-479ccbe-1.fdyrTe")
    }
    pub const DETAIL_TITLE: &str = ".sc-6e54cb25-16.ijRIAC";
    pub const DETAIL_VALUE: &str = ".sc-6e54cb25-4.kjoKdz";

    /// Bathroom count, condition and status, in that order.
    pub fn info_blocks() -> Locator {
        Locator::css(".sc-1b705347-0.hoeUnZ .sc-1b705347-1.brMFse")
    }

    pub fn feature_items() -> Locator {
        Locator::css(".sc-abd90df5-0 .sc-abd90df5-1")
    }
    /// Class carried by features the listing does not have.
    pub const FEATURE_ABSENT_CLASS: &str = "cWzNVx";

    /// Category, property type, transaction type, in that order.
    pub fn breadcrumb_links() -> Locator {
        Locator::css(".sc-3e6bc6bd-20.emoNi a")
    }

    pub const HEADING: &str = "h3";
}

/// The listing site records are replayed into.
pub mod destination {
    use crate::locator::{xpath_literal, Locator};

    pub const CREATE_URL: &str = "https://home.ss.ge/ka/udzravi-qoneba/create";

    pub fn login_open() -> Locator {
        Locator::css(".sc-8ce7b879-10")
    }

    pub fn email() -> Locator {
        Locator::css("input[name='email']")
    }

    pub fn password() -> Locator {
        Locator::css("input[name='password']")
    }

    pub fn login_submit() -> Locator {
        Locator::css("button.sc-1c794266-1.cFcCnt")
    }

    /// Offered when an earlier submission was left unfinished.
    pub fn resume_draft() -> Locator {
        Locator::css("div.sc-b3bd94d2-0.kmSDJX > button.sc-1c794266-1.eqszNP")
    }

    /// Property-type and transaction-type tiles, matched by their exact label.
    pub fn category_option(label: &str) -> Locator {
        Locator::text("div", label)
    }

    pub fn file_input() -> Locator {
        Locator::css("input[type='file']")
    }

    pub fn address_input() -> Locator {
        Locator::css("input#react-select-3-input.select__input")
    }

    pub fn house_number() -> Locator {
        Locator::css("input[name='street_number']")
    }

    /// First chip on the page with this exact label (rooms, status, condition).
    pub fn choice(label: &str) -> Locator {
        Locator::xpath(format!(
            "//div[@class='sc-226b651b-0 kgzsHg']/p[text()={}]",
            xpath_literal(label)
        ))
    }

    /// Chip with this label inside the `block`-th (1-based) details block.
    fn block_choice(block: usize, label: &str) -> Locator {
        Locator::xpath(format!(
            "(//*[@id='create-app-details']//div[contains(@class, 'sc-e8a87f7a-1')])[{block}]\
             //div[contains(@class, 'sc-226b651b-0')][p[normalize-space(.)={}]]",
            xpath_literal(label)
        ))
    }

    /// Bedroom chips repeat the room labels, so they are looked up in their own block.
    pub fn bedroom_choice(label: &str) -> Locator {
        block_choice(2, label)
    }

    pub fn bathroom_choice(label: &str) -> Locator {
        block_choice(7, label)
    }

    pub fn total_area() -> Locator {
        Locator::css("input[name='totalArea']")
    }

    pub fn floor() -> Locator {
        Locator::css("input[name='floor']")
    }

    pub fn floor_count() -> Locator {
        Locator::css("input[name='floors']")
    }

    pub fn feature_toggles() -> Locator {
        Locator::xpath("//div[@class='sc-226b651b-0 sc-226b651b-1 kgzsHg LZoqF']")
    }
    pub const FEATURE_LABEL: &str = "p";

    pub fn description() -> Locator {
        Locator::css("div.sc-4ccf129b-2.blumtp textarea")
    }

    const PRICE_MODES: &str = "//*[@id='create-app-price']//div[contains(@class, 'jKKqhD')]//label";

    /// The two price-unit labels; the selected one carries [`ACTIVE_CLASS`].
    pub fn price_modes() -> Locator {
        Locator::xpath(PRICE_MODES)
    }
    pub const ACTIVE_CLASS: &str = "active";

    pub fn price_input(mode: usize) -> Locator {
        Locator::xpath(format!("({PRICE_MODES})[{}]//input", mode + 1))
    }

    pub fn phone() -> Locator {
        Locator::css("input[placeholder='მობილურის ნომერი']")
    }

    pub fn continue_button() -> Locator {
        Locator::css("button.sc-1c794266-1.dICGws.btn-next")
    }

    pub fn finish_button() -> Locator {
        Locator::text("button", "დასრულება")
    }

    pub fn copy_link_button() -> Locator {
        Locator::text("button", "ლინკის კოპირება")
    }
}
