//! Intent Router
//!
//! Classifies a query as either:
//! - Booking: scheduling/reservation requests, dispatched to the operations stub
//! - Advisory: everything else, dispatched to the intelligence pipeline
//!
//! Classification is a pure local rule with no model call, so routing stays
//! deterministic, adds no latency, and is testable without mocking a
//! generation capability.

use crate::models::{AgentKind, Intent, RoutingDecision};

/// Static keyword list — zero allocation. Includes the Korean booking terms
/// the platform's users write alongside the English ones.
const BOOKING_KEYWORDS: &[&str] = &[
    "booking", "book a", "reserve", "reservation", "schedule", "reschedule",
    "appointment", "availability", "예약", "일정",
];

pub struct IntentRouter;

impl IntentRouter {
    /// Route a raw user query to a downstream agent.
    pub fn route(query: &str) -> RoutingDecision {
        let lowered = query.to_lowercase();

        if BOOKING_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
            RoutingDecision {
                intent: Intent::Booking,
                next_agent: AgentKind::Operations,
            }
        } else {
            RoutingDecision {
                intent: Intent::Advisory,
                next_agent: AgentKind::Intelligence,
            }
        }
    }
}
