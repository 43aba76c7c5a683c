//! Keybinding registry: maps key events to actions, per view, with config
//! overrides.
use crossterm::event::{KeyCode, KeyModifiers};
use std::collections::HashMap;

// ============================================================================
// Action Enum
// ============================================================================

/// Every user-facing action a key can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Quit,
    NavDown,
    NavUp,
    PageDown,
    PageUp,
    Back,
    Select,
    Reload,
    EnterSearch,
    ClearFilters,
    OpenGenreMenu,
    OpenPlatformMenu,
    ToggleWishlist,
    ShowWishlist,
    ShowProfile,
    SignIn,
    SignOut,
    WriteComment,
    DeleteComment,
    EditAccount,
    OpenWebsite,
    ScrollDown,
    ScrollUp,
    CycleTheme,
    ShowHelp,
    Submit,
    Cancel,
    NextField,
    ToggleSignUp,
}

impl Action {
    /// Help screen text.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Quit => "Quit",
            Self::NavDown => "Move down",
            Self::NavUp => "Move up",
            Self::PageDown => "Page down",
            Self::PageUp => "Page up",
            Self::Back => "Go back / close",
            Self::Select => "Open / choose",
            Self::Reload => "Reload",
            Self::EnterSearch => "Search games",
            Self::ClearFilters => "Clear search and filters",
            Self::OpenGenreMenu => "Filter by genre",
            Self::OpenPlatformMenu => "Filter by platform",
            Self::ToggleWishlist => "Add to / remove from wishlist",
            Self::ShowWishlist => "Show wishlist",
            Self::ShowProfile => "Show profile",
            Self::SignIn => "Sign in / register",
            Self::SignOut => "Sign out",
            Self::WriteComment => "Write a comment",
            Self::DeleteComment => "Delete your comment",
            Self::EditAccount => "Change email or password",
            Self::OpenWebsite => "Open game website",
            Self::ScrollDown => "Scroll details down",
            Self::ScrollUp => "Scroll details up",
            Self::CycleTheme => "Switch light/dark theme",
            Self::ShowHelp => "Show help",
            Self::Submit => "Submit",
            Self::Cancel => "Cancel",
            Self::NextField => "Next field",
            Self::ToggleSignUp => "Switch sign in / register",
        }
    }

    /// Config name, as used in `[keybindings]`.
    pub fn config_name(self) -> &'static str {
        match self {
            Self::Quit => "quit",
            Self::NavDown => "nav_down",
            Self::NavUp => "nav_up",
            Self::PageDown => "page_down",
            Self::PageUp => "page_up",
            Self::Back => "back",
            Self::Select => "select",
            Self::Reload => "reload",
            Self::EnterSearch => "search",
            Self::ClearFilters => "clear_filters",
            Self::OpenGenreMenu => "genre_menu",
            Self::OpenPlatformMenu => "platform_menu",
            Self::ToggleWishlist => "toggle_wishlist",
            Self::ShowWishlist => "show_wishlist",
            Self::ShowProfile => "show_profile",
            Self::SignIn => "sign_in",
            Self::SignOut => "sign_out",
            Self::WriteComment => "write_comment",
            Self::DeleteComment => "delete_comment",
            Self::EditAccount => "edit_account",
            Self::OpenWebsite => "open_website",
            Self::ScrollDown => "scroll_down",
            Self::ScrollUp => "scroll_up",
            Self::CycleTheme => "theme",
            Self::ShowHelp => "help",
            Self::Submit => "submit",
            Self::Cancel => "cancel",
            Self::NextField => "next_field",
            Self::ToggleSignUp => "toggle_sign_up",
        }
    }

    const ALL: [Action; 29] = [
        Self::Quit,
        Self::NavDown,
        Self::NavUp,
        Self::PageDown,
        Self::PageUp,
        Self::Back,
        Self::Select,
        Self::Reload,
        Self::EnterSearch,
        Self::ClearFilters,
        Self::OpenGenreMenu,
        Self::OpenPlatformMenu,
        Self::ToggleWishlist,
        Self::ShowWishlist,
        Self::ShowProfile,
        Self::SignIn,
        Self::SignOut,
        Self::WriteComment,
        Self::DeleteComment,
        Self::EditAccount,
        Self::OpenWebsite,
        Self::ScrollDown,
        Self::ScrollUp,
        Self::CycleTheme,
        Self::ShowHelp,
        Self::Submit,
        Self::Cancel,
        Self::NextField,
        Self::ToggleSignUp,
    ];

    /// Parse a config name (case-insensitive, `-` and `_` interchangeable).
    fn from_config_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|a| a.config_name() == name)
    }
}

// ============================================================================
// Context Enum
// ============================================================================

/// Which bindings are active. Lookups fall back to `Global`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Context {
    Global,
    Catalog,
    Details,
    Wishlist,
    Profile,
    /// Genre/platform picker is open.
    Menu,
    /// A text field has focus (search bar, comment box, forms).
    TextInput,
}

impl Context {
    pub fn label(self) -> &'static str {
        match self {
            Self::Global => "Everywhere",
            Self::Catalog => "Catalog",
            Self::Details => "Game page",
            Self::Wishlist => "Wishlist",
            Self::Profile => "Profile",
            Self::Menu => "Filter menu",
            Self::TextInput => "Text fields",
        }
    }
}

// ============================================================================
// Key Specification
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeySpec {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeySpec {
    pub const fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    pub const fn plain(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    pub const fn char(c: char) -> Self {
        Self::plain(KeyCode::Char(c))
    }

    pub const fn ctrl(c: char) -> Self {
        Self::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    /// Builds a spec from a terminal event. Shift is dropped for characters,
    /// since the character itself already carries the case.
    pub fn from_event(code: KeyCode, modifiers: KeyModifiers) -> Self {
        let modifiers = match code {
            KeyCode::Char(_) => modifiers.difference(KeyModifiers::SHIFT),
            _ => modifiers,
        };
        Self::new(code, modifiers)
    }
}

/// Parses a key string from config: "q", "Ctrl+d", "Enter", "F5", "Space".
fn parse_key_string(s: &str) -> Option<KeySpec> {
    let s = s.trim();

    if let Some(rest) = s
        .strip_prefix("Ctrl+")
        .or_else(|| s.strip_prefix("ctrl+"))
    {
        let mut chars = rest.trim().chars();
        let c = chars.next()?;
        return chars.next().is_none().then(|| KeySpec::ctrl(c.to_ascii_lowercase()));
    }

    let named = match s.to_ascii_lowercase().as_str() {
        "enter" | "return" => Some(KeyCode::Enter),
        "esc" | "escape" => Some(KeyCode::Esc),
        "tab" => Some(KeyCode::Tab),
        "backtab" => Some(KeyCode::BackTab),
        "up" => Some(KeyCode::Up),
        "down" => Some(KeyCode::Down),
        "left" => Some(KeyCode::Left),
        "right" => Some(KeyCode::Right),
        "pageup" => Some(KeyCode::PageUp),
        "pagedown" => Some(KeyCode::PageDown),
        "backspace" => Some(KeyCode::Backspace),
        "space" => Some(KeyCode::Char(' ')),
        _ => None,
    };
    if let Some(code) = named {
        return Some(KeySpec::plain(code));
    }

    if let Some(n) = s
        .strip_prefix(&['F', 'f'][..])
        .and_then(|n| n.parse::<u8>().ok())
        .filter(|n| (1..=12).contains(n))
    {
        return Some(KeySpec::plain(KeyCode::F(n)));
    }

    let mut chars = s.chars();
    let c = chars.next()?;
    chars.next().is_none().then(|| KeySpec::char(c))
}

/// Human-readable key for the help screen.
fn format_key(key: &KeySpec) -> String {
    let name = match key.code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::F(n) => format!("F{n}"),
        KeyCode::Enter => "Enter".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::BackTab => "BackTab".to_string(),
        KeyCode::Up => "Up".to_string(),
        KeyCode::Down => "Down".to_string(),
        KeyCode::Left => "Left".to_string(),
        KeyCode::Right => "Right".to_string(),
        KeyCode::PageUp => "PageUp".to_string(),
        KeyCode::PageDown => "PageDown".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        _ => "?".to_string(),
    };
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        format!("Ctrl+{name}")
    } else {
        name
    }
}

// ============================================================================
// Keybinding Registry
// ============================================================================

/// `(Context, KeySpec) -> Action` with defaults and config overrides.
///
/// The same key can mean different things in different views; a lookup in a
/// specific context falls back to `Global`.
pub struct KeybindingRegistry {
    lookup: HashMap<(Context, KeySpec), Action>,
    /// In registration order, for the help screen.
    bindings: Vec<(Context, KeySpec, Action)>,
}

impl KeybindingRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            lookup: HashMap::new(),
            bindings: Vec::new(),
        };
        registry.register_defaults();
        registry
    }

    fn bind(&mut self, context: Context, key: KeySpec, action: Action) {
        self.lookup.insert((context, key), action);
        self.bindings.push((context, key, action));
    }

    fn bind_all(&mut self, context: Context, pairs: &[(KeySpec, Action)]) {
        for &(key, action) in pairs {
            self.bind(context, key, action);
        }
    }

    fn register_defaults(&mut self) {
        use Action::*;

        self.bind_all(
            Context::Global,
            &[
                (KeySpec::char('q'), Quit),
                (KeySpec::char('j'), NavDown),
                (KeySpec::plain(KeyCode::Down), NavDown),
                (KeySpec::char('k'), NavUp),
                (KeySpec::plain(KeyCode::Up), NavUp),
                (KeySpec::ctrl('d'), PageDown),
                (KeySpec::plain(KeyCode::PageDown), PageDown),
                (KeySpec::ctrl('u'), PageUp),
                (KeySpec::plain(KeyCode::PageUp), PageUp),
                (KeySpec::plain(KeyCode::Esc), Back),
                (KeySpec::plain(KeyCode::Enter), Select),
                (KeySpec::char('r'), Reload),
                (KeySpec::char('W'), ShowWishlist),
                (KeySpec::char('P'), ShowProfile),
                (KeySpec::char('L'), SignIn),
                (KeySpec::char('T'), CycleTheme),
                (KeySpec::char('?'), ShowHelp),
            ],
        );

        self.bind_all(
            Context::Catalog,
            &[
                (KeySpec::char('/'), EnterSearch),
                (KeySpec::char('x'), ClearFilters),
                (KeySpec::char('g'), OpenGenreMenu),
                (KeySpec::char('p'), OpenPlatformMenu),
                (KeySpec::char('w'), ToggleWishlist),
            ],
        );

        self.bind_all(
            Context::Details,
            &[
                (KeySpec::char('w'), ToggleWishlist),
                (KeySpec::char('c'), WriteComment),
                (KeySpec::char('d'), DeleteComment),
                (KeySpec::char('o'), OpenWebsite),
                (KeySpec::char('J'), ScrollDown),
                (KeySpec::char('K'), ScrollUp),
            ],
        );

        self.bind_all(
            Context::Wishlist,
            &[
                (KeySpec::char('w'), ToggleWishlist),
                (KeySpec::char('d'), ToggleWishlist),
            ],
        );

        self.bind_all(
            Context::Profile,
            &[
                (KeySpec::char('e'), EditAccount),
                (KeySpec::char('d'), DeleteComment),
                (KeySpec::char('X'), SignOut),
            ],
        );

        // Menu keeps nav/select/back from Global; everything else closes it
        self.bind_all(
            Context::Menu,
            &[
                (KeySpec::char('j'), NavDown),
                (KeySpec::plain(KeyCode::Down), NavDown),
                (KeySpec::char('k'), NavUp),
                (KeySpec::plain(KeyCode::Up), NavUp),
                (KeySpec::plain(KeyCode::Enter), Select),
                (KeySpec::plain(KeyCode::Esc), Back),
            ],
        );

        self.bind_all(
            Context::TextInput,
            &[
                (KeySpec::plain(KeyCode::Enter), Submit),
                (KeySpec::plain(KeyCode::Esc), Cancel),
                (KeySpec::plain(KeyCode::Tab), NextField),
                (KeySpec::ctrl('r'), ToggleSignUp),
            ],
        );
    }

    /// Applies `[keybindings]` overrides (action name → key string).
    ///
    /// The action loses its old keys in every context it was bound in and
    /// gets the new key there instead. Returns a warning per entry that could
    /// not be applied.
    pub fn apply_overrides(&mut self, overrides: &HashMap<String, String>) -> Vec<String> {
        let mut warnings = Vec::new();

        // Sorted so repeated runs warn in the same order
        let mut entries: Vec<_> = overrides.iter().collect();
        entries.sort();

        for (action_name, key_str) in entries {
            let Some(action) = Action::from_config_name(action_name) else {
                warnings.push(format!("Unknown action '{action_name}', ignoring"));
                continue;
            };
            let Some(key) = parse_key_string(key_str) else {
                warnings.push(format!(
                    "Cannot parse key '{key_str}' for action '{action_name}', ignoring"
                ));
                continue;
            };

            let mut contexts: Vec<Context> = self
                .bindings
                .iter()
                .filter(|(_, _, a)| *a == action)
                .map(|(c, _, _)| *c)
                .collect();
            contexts.dedup();

            self.lookup.retain(|_, a| *a != action);
            self.bindings.retain(|(_, _, a)| *a != action);
            for ctx in contexts {
                self.bind(ctx, key, action);
            }

            tracing::info!(action = %action_name, key = %key_str, "Applied keybinding override");
        }

        warnings
    }

    /// Looks up `context` first, then `Global`.
    pub fn action_for_key(
        &self,
        code: KeyCode,
        modifiers: KeyModifiers,
        context: Context,
    ) -> Option<Action> {
        let key = KeySpec::from_event(code, modifiers);
        self.lookup
            .get(&(context, key))
            .or_else(|| self.lookup.get(&(Context::Global, key)))
            .copied()
    }

    /// Like `action_for_key` but without the `Global` fallback.
    pub fn action_in_context(
        &self,
        code: KeyCode,
        modifiers: KeyModifiers,
        context: Context,
    ) -> Option<Action> {
        let key = KeySpec::from_event(code, modifiers);
        self.lookup.get(&(context, key)).copied()
    }

    /// (context, key label, description) for every binding.
    pub fn all_bindings(&self) -> Vec<(Context, String, &'static str)> {
        self.bindings
            .iter()
            .map(|(ctx, key, action)| (*ctx, format_key(key), action.describe()))
            .collect()
    }
}

impl Default for KeybindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
