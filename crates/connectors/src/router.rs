//! Route search and best-trade selection over constant-product pairs.

use crate::error::SdkError;
use crate::pair::Pair;
use crate::types::{Amount, Percent, Token, TokenId};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use tracing::debug;

/// A single hop in a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteHop {
    /// The pair traded through for this hop.
    pub pair: Pair,
    /// The input token for this hop.
    pub token_in: TokenId,
    /// The output token for this hop.
    pub token_out: TokenId,
}

/// A complete route from one token to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// The hops in this route.
    pub hops: Vec<RouteHop>,
}

impl Route {
    /// Get the number of hops in this route.
    pub fn len(&self) -> usize {
        self.hops.len()
    }

    /// Check if the route is empty.
    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// Get the input token.
    pub fn token_in(&self) -> Option<TokenId> {
        self.hops.first().map(|h| h.token_in)
    }

    /// Get the output token.
    pub fn token_out(&self) -> Option<TokenId> {
        self.hops.last().map(|h| h.token_out)
    }

    /// Token addresses along the route, input first.
    pub fn path(&self) -> Vec<TokenId> {
        let mut path = Vec::with_capacity(self.hops.len() + 1);
        if let Some(first) = self.hops.first() {
            path.push(first.token_in);
        }
        path.extend(self.hops.iter().map(|h| h.token_out));
        path
    }
}

/// Whether the fixed side of a trade is the input or the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeType {
    ExactInput,
    ExactOutput,
}

/// A priced trade along a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trade {
    pub route: Route,
    pub trade_type: TradeType,
    /// Token spent. Reported as the wrapped token when the trade starts from
    /// the native coin; see `native_in`.
    pub input_token: Token,
    pub output_token: Token,
    pub input_amount: Amount,
    pub output_amount: Amount,
    /// The input is paid in the chain's native coin.
    pub native_in: bool,
    /// The output is received in the chain's native coin.
    pub native_out: bool,
}

impl Trade {
    /// Price a route for a fixed input amount.
    pub fn exact_in(route: Route, amount_in: Amount) -> Result<Self, SdkError> {
        let (input_token, output_token) = Self::endpoints(&route)?;

        let mut amount = amount_in;
        for hop in &route.hops {
            amount = hop.pair.output_amount(hop.token_in, amount)?;
        }

        Ok(Self {
            route,
            trade_type: TradeType::ExactInput,
            input_token,
            output_token,
            input_amount: amount_in,
            output_amount: amount,
            native_in: false,
            native_out: false,
        })
    }

    /// Price a route for a fixed output amount, walking it backwards.
    pub fn exact_out(route: Route, amount_out: Amount) -> Result<Self, SdkError> {
        let (input_token, output_token) = Self::endpoints(&route)?;

        let mut amount = amount_out;
        for hop in route.hops.iter().rev() {
            amount = hop.pair.input_amount(hop.token_out, amount)?;
        }

        Ok(Self {
            route,
            trade_type: TradeType::ExactOutput,
            input_token,
            output_token,
            input_amount: amount,
            output_amount: amount_out,
            native_in: false,
            native_out: false,
        })
    }

    fn endpoints(route: &Route) -> Result<(Token, Token), SdkError> {
        let first = route.hops.first().ok_or(SdkError::InvalidRoute)?;
        let last = route.hops.last().ok_or(SdkError::InvalidRoute)?;
        let input = first.pair.token(first.token_in).ok_or(SdkError::InvalidRoute)?;
        let output = last.pair.token(last.token_out).ok_or(SdkError::InvalidRoute)?;
        Ok((input.clone(), output.clone()))
    }

    /// Mark which sides of the trade settle in the native coin.
    pub fn with_native(mut self, native_in: bool, native_out: bool) -> Self {
        self.native_in = native_in;
        self.native_out = native_out;
        self
    }

    /// Least output accepted under the given slippage.
    /// Exact-output trades return their fixed output.
    pub fn minimum_amount_out(&self, slippage: &Percent) -> Result<Amount, SdkError> {
        match self.trade_type {
            TradeType::ExactOutput => Ok(self.output_amount),
            TradeType::ExactInput => slippage
                .discount(self.output_amount)
                .ok_or(SdkError::Overflow),
        }
    }

    /// Most input spent under the given slippage.
    /// Exact-input trades return their fixed input.
    pub fn maximum_amount_in(&self, slippage: &Percent) -> Result<Amount, SdkError> {
        match self.trade_type {
            TradeType::ExactInput => Ok(self.input_amount),
            TradeType::ExactOutput => slippage
                .markup(self.input_amount)
                .ok_or(SdkError::Overflow),
        }
    }

    /// Best first: more output for exact input, less input for exact output,
    /// then fewer hops.
    fn compare(&self, other: &Self) -> Ordering {
        let by_amount = match self.trade_type {
            TradeType::ExactInput => other
                .output_amount
                .cmp(&self.output_amount)
                .then(self.input_amount.cmp(&other.input_amount)),
            TradeType::ExactOutput => self
                .input_amount
                .cmp(&other.input_amount)
                .then(other.output_amount.cmp(&self.output_amount)),
        };
        by_amount.then(self.route.len().cmp(&other.route.len()))
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.trade_type {
            TradeType::ExactInput => "exact-in",
            TradeType::ExactOutput => "exact-out",
        };
        write!(
            f,
            "{} {} {} -> {} {} via",
            kind,
            self.input_amount,
            self.input_token.symbol,
            self.output_amount,
            self.output_token.symbol
        )?;
        for hop in &self.route.hops {
            write!(f, " [{}]", hop.pair)?;
        }
        Ok(())
    }
}

/// Limits for the best-trade search.
#[derive(Debug, Clone, Copy)]
pub struct TradeOptions {
    /// Maximum number of trades returned.
    pub max_num_results: usize,
    /// Maximum number of pairs a route may go through.
    pub max_hops: usize,
}

impl Default for TradeOptions {
    fn default() -> Self {
        Self {
            max_num_results: 3,
            max_hops: 3,
        }
    }
}

impl TradeOptions {
    /// Set the maximum number of hops.
    pub fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    /// Set the maximum number of results.
    pub fn with_max_num_results(mut self, max_num_results: usize) -> Self {
        self.max_num_results = max_num_results;
        self
    }
}

/// Router for finding paths between tokens.
#[derive(Debug, Default)]
pub struct Router {
    /// Graph of token connections.
    /// Maps each token to a set of tokens it can be traded with directly.
    graph: HashMap<TokenId, HashSet<TokenId>>,
    /// Maps token pairs to their pair.
    pairs: HashMap<(TokenId, TokenId), Pair>,
}

impl Router {
    /// Create a new router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a router over the given pairs.
    pub fn from_pairs(pairs: &[Pair]) -> Self {
        let mut router = Self::new();
        for pair in pairs {
            router.add_pair(pair.clone());
        }
        router
    }

    /// Add a pair to the router.
    pub fn add_pair(&mut self, pair: Pair) {
        let a = pair.token0().address;
        let b = pair.token1().address;

        // Add bidirectional edges
        self.graph.entry(a).or_default().insert(b);
        self.graph.entry(b).or_default().insert(a);

        // Store pair info for both directions
        self.pairs.insert((a, b), pair.clone());
        self.pairs.insert((b, a), pair);
    }

    /// Find all routes between two tokens up to a maximum number of hops.
    /// Uses BFS to find shortest paths first.
    pub fn find_routes(&self, token_in: TokenId, token_out: TokenId, max_hops: usize) -> Vec<Route> {
        let mut routes = Vec::new();

        let mut queue: VecDeque<(TokenId, Vec<TokenId>)> = VecDeque::new();
        queue.push_back((token_in, vec![token_in]));

        while let Some((current, path)) = queue.pop_front() {
            if path.len() > max_hops + 1 {
                continue;
            }

            if current == token_out && path.len() > 1 {
                if let Some(route) = self.path_to_route(&path) {
                    routes.push(route);
                }
                continue;
            }

            if let Some(neighbors) = self.graph.get(&current) {
                for &neighbor in neighbors {
                    // Avoid cycles
                    if path.contains(&neighbor) {
                        continue;
                    }

                    let mut new_path = path.clone();
                    new_path.push(neighbor);
                    queue.push_back((neighbor, new_path));
                }
            }
        }

        routes.sort_by_key(|r| r.len());
        routes
    }

    /// Convert a path of tokens to a Route.
    fn path_to_route(&self, path: &[TokenId]) -> Option<Route> {
        if path.len() < 2 {
            return None;
        }

        let mut hops = Vec::with_capacity(path.len() - 1);
        for window in path.windows(2) {
            let token_in = window[0];
            let token_out = window[1];
            let pair = self.pairs.get(&(token_in, token_out))?;

            hops.push(RouteHop {
                pair: pair.clone(),
                token_in,
                token_out,
            });
        }

        Some(Route { hops })
    }

    /// Price every route with `price`, dropping routes that run out of
    /// liquidity, and keep the best `max_num_results`.
    fn best_trades<F>(
        &self,
        token_in: TokenId,
        token_out: TokenId,
        options: TradeOptions,
        price: F,
    ) -> Result<Vec<Trade>, SdkError>
    where
        F: Fn(Route) -> Result<Trade, SdkError>,
    {
        let mut trades = Vec::new();

        for route in self.find_routes(token_in, token_out, options.max_hops) {
            match price(route) {
                Ok(trade) => trades.push(trade),
                Err(e) if e.is_insufficient_liquidity() => {
                    debug!(error = %e, "skipping route without liquidity");
                }
                Err(e) => return Err(e),
            }
        }

        trades.sort_by(Trade::compare);
        trades.truncate(options.max_num_results);
        Ok(trades)
    }
}

/// Best trades spending exactly `amount_in` of `token_in` for `token_out`.
///
/// An empty result means no route with liquidity exists.
pub fn best_trade_exact_in(
    pairs: &[Pair],
    token_in: &Token,
    amount_in: Amount,
    token_out: &Token,
    options: TradeOptions,
) -> Result<Vec<Trade>, SdkError> {
    Router::from_pairs(pairs).best_trades(token_in.address, token_out.address, options, |route| {
        Trade::exact_in(route, amount_in)
    })
}

/// Best trades receiving exactly `amount_out` of `token_out` for `token_in`.
///
/// An empty result means no route with liquidity exists.
pub fn best_trade_exact_out(
    pairs: &[Pair],
    token_in: &Token,
    token_out: &Token,
    amount_out: Amount,
    options: TradeOptions,
) -> Result<Vec<Trade>, SdkError> {
    Router::from_pairs(pairs).best_trades(token_in.address, token_out.address, options, |route| {
        Trade::exact_out(route, amount_out)
    })
}
