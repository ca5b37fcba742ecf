//! Ledger queries from the command line

use anyhow::Result;

use aerie::config::Settings;
use aerie::intel::Suggestions;
use aerie::ledger::LedgerDb;

pub fn suggest_command(
    settings: Settings,
    context: Option<String>,
    prefix: Option<String>,
    limit: Option<usize>,
) -> Result<()> {
    let db = LedgerDb::open(&settings.ledger_db_path())?;
    let suggestions = Suggestions::new(db);
    let limit = limit.unwrap_or(settings.suggestion_limit);

    let results = match (&context, &prefix) {
        (Some(context), _) => suggestions.suggest_ranked(context, limit),
        (None, Some(prefix)) => suggestions
            .suggest_by_prefix(prefix, limit)
            .into_iter()
            .map(|command| aerie::intel::RankedCommand {
                command,
                frequency: 0,
            })
            .collect(),
        (None, None) => suggestions
            .popular(limit)
            .into_iter()
            .map(|command| aerie::intel::RankedCommand {
                command,
                frequency: 0,
            })
            .collect(),
    };

    if results.is_empty() {
        println!("No learned commands match.");
        return Ok(());
    }
    for ranked in results {
        if ranked.frequency > 0 {
            println!("{:>5}  {}", ranked.frequency, ranked.command);
        } else {
            println!("{}", ranked.command);
        }
    }
    Ok(())
}
