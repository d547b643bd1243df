use std::{future::ready, sync::Arc};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use engine::{
    CategoryFilter, DateRange, Expense, SortSpec, aggregate_by_category, apply_filter,
    bucket_by_day, bucket_by_month, bucket_by_week, budget_status, summarize, top_categories,
};
use router::{
    BeforeGuard, FragmentChanges, Location, MemoryLocation, Navigation, Params, Router,
    Transition, parse_fragment,
};
use store::{Change, LoggingMiddleware};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
    commands::Command,
    config::AppConfig,
    error::Result,
    persistence::{Autosave, Persistence},
    state::{AppState, Loaded, Removal, StateKey},
    views,
};

const TOP_CATEGORIES: usize = 5;
const RECENT_EXPENSES: usize = 5;

/// Where rendered views go.
pub trait Screen: Send + Sync {
    fn show(&self, text: &str);
}

/// Prints views on stdout.
pub struct Terminal;

impl Screen for Terminal {
    fn show(&self, text: &str) {
        println!("{text}\n");
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Routable views.
const VIEWS: [&str; 5] = ["dashboard", "expenses", "stats", "budgets", "settings"];

/// Whether `view` shows data held in `key`.
fn depends_on(view: &str, key: StateKey) -> bool {
    match key {
        StateKey::Expenses => matches!(view, "dashboard" | "expenses" | "stats" | "budgets"),
        StateKey::Settings => VIEWS.contains(&view),
        StateKey::Filters => view == "expenses",
        StateKey::Budgets => view == "budgets",
        StateKey::CurrentView | StateKey::IsLoading => false,
    }
}

/// Shared by route handlers, hooks and the render subscriber.
#[derive(Clone)]
struct Context {
    state: AppState,
    screen: Arc<dyn Screen>,
    config: Arc<AppConfig>,
    tz: Tz,
}

impl Context {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }

    fn render(&self, view: &str) {
        let text = match view {
            "dashboard" => self.dashboard(),
            "expenses" => self.expenses(),
            "stats" => self.stats(),
            "budgets" => self.budgets(),
            "settings" => views::settings(&self.state.settings(), &self.config),
            _ => return,
        };
        self.screen.show(&text);
    }

    /// Re-renders the current view when a change touches its data.
    fn refresh(&self, change: &Change<StateKey>) {
        let view = self.state.current_view();
        if change.keys().iter().any(|key| depends_on(&view, *key)) {
            tracing::debug!(%view, ?change, "re-rendering");
            self.render(&view);
        }
    }

    fn dashboard(&self) -> String {
        let now = self.now();
        let expenses = self.state.expenses();
        let summary = summarize(&expenses, &now);
        let top = top_categories(&aggregate_by_category(&expenses), TOP_CATEGORIES);
        let mut recent: Vec<&Expense> = expenses.iter().collect();
        recent.sort_by(|a, b| b.date.cmp(&a.date));
        recent.truncate(RECENT_EXPENSES);
        views::dashboard(&summary, &top, &recent, &self.state.settings().currency, &self.tz)
    }

    fn expenses(&self) -> String {
        let expenses = self.state.expenses();
        let filters = self.state.filters();
        let list = apply_filter(&expenses, &filters, &self.now());
        views::expenses(&list, &filters, &self.state.settings().currency, &self.tz)
    }

    fn stats(&self) -> String {
        let now = self.now();
        let expenses = self.state.expenses();
        views::stats(
            &aggregate_by_category(&expenses),
            &bucket_by_month(&expenses, self.config.chart_months, &now),
            &bucket_by_week(&expenses, self.config.chart_weeks, &now),
            &bucket_by_day(&expenses, self.config.chart_days, &now),
            &self.state.settings().currency,
        )
    }

    fn budgets(&self) -> String {
        let expenses = self.state.expenses();
        let statuses = budget_status(&expenses, &self.state.budgets(), &self.now());
        views::budgets(&statuses, &self.state.settings().currency)
    }

    /// Copies `category`, `range`, `sort` and `q` query parameters into the
    /// filters. Returns whether the filters changed.
    fn apply_params(&self, params: &Params) -> bool {
        let mut problems = Vec::new();
        let changed = self.state.update_filters(|filters| {
            for (name, value) in params {
                match name.as_str() {
                    "category" => match value.parse::<CategoryFilter>() {
                        Ok(category) => filters.category = category,
                        Err(err) => problems.push(err.to_string()),
                    },
                    "range" => match value.parse::<DateRange>() {
                        Ok(range) => filters.date_range = range,
                        Err(err) => problems.push(err.to_string()),
                    },
                    "sort" if value.is_empty() || value == "none" => filters.sort = None,
                    "sort" => match value.parse::<SortSpec>() {
                        Ok(sort) => filters.sort = Some(sort),
                        Err(err) => problems.push(err.to_string()),
                    },
                    "q" => filters.search_query.clone_from(value),
                    other => tracing::debug!(param = other, "ignoring unknown parameter"),
                }
            }
        });
        for problem in problems {
            tracing::warn!("ignoring parameter: {problem}");
            self.screen.show(&format!("ignored: {problem}"));
        }
        changed
    }
}

/// Refuses every navigation while the initial load is running.
struct NotWhileLoading {
    state: AppState,
}

#[async_trait::async_trait]
impl BeforeGuard for NotWhileLoading {
    async fn allow(&self, transition: &Transition) -> bool {
        if self.state.is_loading() {
            tracing::warn!(to = %transition.to.path, "navigation refused while loading");
            return false;
        }
        true
    }
}

/// Composition root: one state, one router, one location.
pub struct App {
    ctx: Context,
    router: Router,
    location: Arc<MemoryLocation>,
}

impl App {
    /// Wires state, persistence and routes, then loads persisted data.
    ///
    /// Nothing is rendered until [`App::start`].
    pub fn build(
        config: AppConfig,
        persistence: Arc<dyn Persistence>,
        screen: Arc<dyn Screen>,
    ) -> Result<(Self, FragmentChanges)> {
        let tz = config.tz()?;
        let state = AppState::new();
        state.store().use_middleware(LoggingMiddleware);
        state
            .store()
            .use_middleware(Autosave::new(Arc::clone(&persistence)));

        let ctx = Context {
            state: state.clone(),
            screen,
            config: Arc::new(config),
            tz,
        };
        {
            let ctx = ctx.clone();
            // Lives as long as the store.
            let _render = state.store().subscribe_all(move |_, change| ctx.refresh(change));
        }

        let (location, changes) = MemoryLocation::new("");
        let location = Arc::new(location);
        let mut router =
            Router::new(location.clone()).with_default_path(ctx.config.default_route.clone());
        Self::register_routes(&mut router, &ctx);

        state.load(Loaded {
            expenses: persistence.load_expenses(),
            settings: persistence.load_settings(),
            budgets: persistence.load_budgets(),
        });
        tracing::info!(
            expenses = state.expenses().len(),
            budgets = state.budgets().len(),
            "data loaded"
        );

        let app = Self {
            ctx,
            router,
            location,
        };
        Ok((app, changes))
    }

    fn register_routes(router: &mut Router, ctx: &Context) {
        for view in ["dashboard", "stats", "budgets", "settings"] {
            let ctx = ctx.clone();
            router.on(view, move |_: Params| {
                ctx.render(view);
                ready(())
            });
        }

        let expenses = ctx.clone();
        router.on("expenses", move |params: Params| {
            let already_rendered =
                expenses.apply_params(&params) && expenses.state.current_view() == "expenses";
            if !already_rendered {
                expenses.render("expenses");
            }
            ready(())
        });

        let missing = ctx.clone();
        router.not_found(move |path: String| {
            missing.screen.show(&views::not_found(&path));
            ready(())
        });

        router.before_each(NotWhileLoading {
            state: ctx.state.clone(),
        });

        let state = ctx.state.clone();
        router.after_each(move |to: String, from: Option<String>| {
            state.set_view(&to);
            tracing::info!(%to, ?from, "view changed");
            ready(())
        });
    }

    /// Resolves the boot fragment (the default view).
    pub async fn start(&self) -> Navigation {
        self.router.start().await
    }

    /// Runs one prompt line.
    pub fn execute(&self, line: &str) -> Flow {
        if line.trim().is_empty() {
            return Flow::Continue;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(err) => {
                self.ctx.screen.show(&format!("error: {err}"));
                return Flow::Continue;
            }
        };
        tracing::debug!(?command, "executing");

        let state = &self.ctx.state;
        match command {
            Command::Go(fragment) => self.router.navigate(&fragment),
            Command::Add {
                amount,
                category,
                description,
            } => {
                let category = category.unwrap_or(state.settings().default_category);
                let expense = Expense::new(amount, category, description, Utc::now());
                let id = expense.id.clone();
                state.add_expense(expense);
                let short = id.get(..8).unwrap_or(&id);
                self.ctx
                    .screen
                    .show(&format!("added {short} ({})", category.label()));
            }
            Command::Remove(prefix) => match state.remove_expense(&prefix) {
                Removal::Removed(expense) => self.ctx.screen.show(&format!(
                    "removed {} {}",
                    expense.amount, expense.description
                )),
                Removal::NotFound => self.ctx.screen.show(&format!("no expense matches {prefix:?}")),
                Removal::Ambiguous(count) => self.ctx.screen.show(&format!(
                    "{count} expenses match {prefix:?}, type more of the id"
                )),
            },
            Command::Search(text) => self.filter(|filters| filters.search_query = text),
            Command::Category(category) => self.filter(|filters| filters.category = category),
            Command::Range(range) => self.filter(|filters| filters.date_range = range),
            Command::Sort(sort) => self.filter(|filters| filters.sort = sort),
            Command::Budget { category, limit } => state.set_budget(category, limit),
            Command::Currency(symbol) => state.update_settings(|settings| settings.currency = symbol),
            Command::Help => self.ctx.screen.show(&views::help()),
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    /// Updates the filters and makes sure the expense list is on screen.
    fn filter(&self, change: impl FnOnce(&mut engine::FilterSpec)) {
        let changed = self.ctx.state.update_filters(change);
        if self.ctx.state.current_view() == "expenses" {
            if !changed {
                self.ctx.render("expenses");
            }
        } else if parse_fragment(&self.location.fragment(), self.router.default_path()).path
            == "expenses"
        {
            // Setting the same fragment again emits no change signal.
            self.ctx.render("expenses");
        } else {
            self.router.navigate("expenses");
        }
    }

    /// Interleaves prompt lines and fragment changes until `quit` or EOF.
    pub async fn run(self, mut changes: FragmentChanges) -> Result<()> {
        self.start().await;
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        loop {
            tokio::select! {
                Some(fragment) = changes.recv() => {
                    self.router.resolve(&fragment).await;
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    if self.execute(&line) == Flow::Quit {
                        break;
                    }
                }
            }
        }

        tracing::info!(fragment = %self.location.fragment(), "shutting down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::TimeDelta;
    use engine::{Budget, Category, Money};

    use super::*;
    use crate::state::Settings;

    #[derive(Default)]
    struct Recorder {
        shown: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.shown.lock().unwrap())
        }
    }

    impl Screen for Recorder {
        fn show(&self, text: &str) {
            self.shown.lock().unwrap().push(text.to_string());
        }
    }

    #[derive(Default)]
    struct Memory {
        expenses: Mutex<Vec<Expense>>,
        saves: Mutex<usize>,
    }

    impl Persistence for Memory {
        fn load_expenses(&self) -> Vec<Expense> {
            self.expenses.lock().unwrap().clone()
        }
        fn save_expenses(&self, expenses: &[Expense]) {
            *self.expenses.lock().unwrap() = expenses.to_vec();
            *self.saves.lock().unwrap() += 1;
        }
        fn load_settings(&self) -> Settings {
            Settings::default()
        }
        fn save_settings(&self, _settings: &Settings) {}
        fn load_budgets(&self) -> Vec<Budget> {
            vec![Budget {
                category: Category::Food,
                limit: Money::from_major(100),
            }]
        }
        fn save_budgets(&self, _budgets: &[Budget]) {}
    }

    fn expense(description: &str, cents: i64, category: Category) -> Expense {
        Expense::new(
            Money::new(cents),
            category,
            description,
            Utc::now() - TimeDelta::minutes(1),
        )
    }

    fn app_with(
        persistence: Arc<Memory>,
    ) -> (App, FragmentChanges, Arc<Recorder>) {
        let screen = Arc::new(Recorder::default());
        let (app, changes) = App::build(AppConfig::default(), persistence, screen.clone()).unwrap();
        (app, changes, screen)
    }

    /// Resolves every pending fragment change, like the run loop would.
    async fn drain(app: &App, changes: &mut FragmentChanges) {
        while let Ok(fragment) = changes.try_recv() {
            app.router.resolve(&fragment).await;
        }
    }

    #[tokio::test]
    async fn boots_into_the_dashboard_after_loading() {
        let memory = Arc::new(Memory::default());
        memory.save_expenses(&[expense("pizza", 1250, Category::Food)]);
        let (app, _changes, screen) = app_with(memory.clone());

        assert!(!app.ctx.state.is_loading());
        assert_eq!(app.ctx.state.expenses().len(), 1);
        assert!(screen.take().is_empty(), "nothing renders before start");

        assert_eq!(app.start().await, Navigation::Handled);
        assert_eq!(app.ctx.state.current_view(), "dashboard");
        let shown = screen.take();
        assert_eq!(shown.len(), 1);
        assert!(shown[0].contains("Dashboard"));
        assert!(shown[0].contains("pizza"));
        // Loading went through a batch, so nothing was written back.
        assert_eq!(*memory.saves.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn add_persists_and_re_renders_the_current_view() {
        let memory = Arc::new(Memory::default());
        let (app, _changes, screen) = app_with(memory.clone());
        app.start().await;
        screen.take();

        assert_eq!(app.execute("add 4.20 transport bus ticket"), Flow::Continue);
        let shown = screen.take();
        assert_eq!(shown.len(), 2, "dashboard refresh plus confirmation: {shown:?}");
        assert!(shown[0].contains("bus ticket"));
        assert!(shown[1].starts_with("added "));

        let saved = memory.expenses.lock().unwrap().clone();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].amount, Money::new(420));
        assert_eq!(saved[0].category, Category::Transport);
    }

    #[tokio::test]
    async fn expenses_route_applies_query_params() {
        let memory = Arc::new(Memory::default());
        memory.save_expenses(&[
            expense("pizza", 1250, Category::Food),
            expense("power bill", 8000, Category::Bills),
        ]);
        let (app, mut changes, screen) = app_with(memory);
        app.start().await;
        screen.take();

        app.execute("#expenses?category=food&sort=amount-desc");
        drain(&app, &mut changes).await;

        assert_eq!(app.ctx.state.current_view(), "expenses");
        let filters = app.ctx.state.filters();
        assert_eq!(filters.category, CategoryFilter::Only(Category::Food));
        let shown = screen.take();
        assert_eq!(shown.len(), 1, "rendered once: {shown:?}");
        assert!(shown[0].contains("pizza"));
        assert!(!shown[0].contains("power bill"));
    }

    #[tokio::test]
    async fn filter_commands_switch_to_the_expense_list() {
        let memory = Arc::new(Memory::default());
        memory.save_expenses(&[
            expense("caffè", 150, Category::Food),
            expense("train", 2300, Category::Transport),
        ]);
        let (app, mut changes, screen) = app_with(memory);
        app.start().await;
        screen.take();

        app.execute("search CAFFE");
        drain(&app, &mut changes).await;
        let shown = screen.take();
        assert_eq!(shown.len(), 1, "{shown:?}");
        assert!(shown[0].contains("caffè"));
        assert!(!shown[0].contains("train"));

        app.execute("search");
        let shown = screen.take();
        assert_eq!(shown.len(), 1);
        assert!(shown[0].contains("train"));
    }

    #[tokio::test]
    async fn filter_command_renders_after_a_cancelled_navigation() {
        let memory = Arc::new(Memory::default());
        memory.save_expenses(&[
            expense("pizza", 1250, Category::Food),
            expense("train", 2300, Category::Transport),
        ]);
        let (app, mut changes, screen) = app_with(memory);
        app.start().await;

        let loading = crate::state::StateValue::IsLoading(true);
        app.ctx.state.store().set_state(StateKey::IsLoading, loading);
        app.execute("#expenses");
        drain(&app, &mut changes).await;
        assert_eq!(app.ctx.state.current_view(), "dashboard");
        let idle = crate::state::StateValue::IsLoading(false);
        app.ctx.state.store().set_state(StateKey::IsLoading, idle);
        screen.take();

        app.execute("category food");
        drain(&app, &mut changes).await;
        let shown = screen.take();
        assert_eq!(shown.len(), 1, "{shown:?}");
        assert!(shown[0].contains("pizza"));
        assert!(!shown[0].contains("train"));
    }

    #[tokio::test]
    async fn unknown_view_shows_not_found() {
        let (app, mut changes, screen) = app_with(Arc::new(Memory::default()));
        app.start().await;
        screen.take();

        app.execute("go reports");
        drain(&app, &mut changes).await;
        let shown = screen.take();
        assert_eq!(shown.len(), 1);
        assert!(shown[0].contains("No view named \"reports\""));
        assert_eq!(app.ctx.state.current_view(), "reports");
    }

    #[tokio::test]
    async fn budget_command_updates_the_budget_view() {
        let memory = Arc::new(Memory::default());
        memory.save_expenses(&[expense("groceries", 12_000, Category::Food)]);
        let (app, mut changes, screen) = app_with(memory);
        app.start().await;

        app.execute("#budgets");
        drain(&app, &mut changes).await;
        let shown = screen.take();
        assert!(shown.last().unwrap().contains("OVER"));

        app.execute("budget food 500");
        let shown = screen.take();
        assert_eq!(shown.len(), 1);
        assert!(!shown[0].contains("OVER"));
        assert_eq!(app.ctx.state.budgets()[0].limit, Money::from_major(500));
    }

    #[tokio::test]
    async fn guard_blocks_navigation_while_loading() {
        let (app, _changes, screen) = app_with(Arc::new(Memory::default()));
        app.start().await;
        screen.take();

        app.ctx.state.store().set_state(
            StateKey::IsLoading,
            crate::state::StateValue::IsLoading(true),
        );
        assert_eq!(app.router.resolve("stats").await, Navigation::Cancelled);
        assert_eq!(app.ctx.state.current_view(), "dashboard");
        assert!(screen.take().is_empty());
    }

    #[tokio::test]
    async fn errors_and_quit() {
        let (app, _changes, screen) = app_with(Arc::new(Memory::default()));
        assert_eq!(app.execute("frobnicate"), Flow::Continue);
        assert!(screen.take()[0].starts_with("error: unknown command"));
        assert_eq!(app.execute("   "), Flow::Continue);
        assert_eq!(app.execute("quit"), Flow::Quit);
    }

    #[test]
    fn invalid_timezone_fails_the_build() {
        let config = AppConfig {
            timezone: "Nowhere/Special".to_string(),
            ..AppConfig::default()
        };
        let result = App::build(config, Arc::new(Memory::default()), Arc::new(Recorder::default()));
        assert!(result.is_err());
    }
}
