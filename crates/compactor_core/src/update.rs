use crate::{AppState, Effect, FailureReason, Msg, Notice};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::FilesSubmitted(files) => {
            if files.is_empty() {
                return (state, Vec::new());
            }
            let started = state.start_jobs(&files);
            state.mark_dirty();
            started
                .into_iter()
                .zip(files)
                .map(|((job_id, family), file)| Effect::Reduce {
                    job_id,
                    family,
                    file,
                })
                .collect()
        }
        Msg::JobProgress { job_id, percent } => {
            if state.apply_progress(job_id, percent) {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::JobFinished { job_id, outcome } => match state.apply_finished(job_id, outcome) {
            // Unknown (cleared) or already terminal: nothing to do.
            None => Vec::new(),
            Some((failure, name)) => {
                state.mark_dirty();
                match failure {
                    None => Vec::new(),
                    Some(reason) => vec![Effect::Notify(Notice {
                        job_id,
                        message: notice_text(reason, &name),
                    })],
                }
            }
        },
        Msg::ClearAllClicked => {
            if !state.jobs().is_empty() {
                state.clear();
                state.mark_dirty();
            }
            Vec::new()
        }
    };

    (state, effects)
}

fn notice_text(reason: FailureReason, name: &str) -> String {
    match reason {
        FailureReason::ReducerFault => format!("Error processing \"{name}\"."),
        FailureReason::NoImprovement => {
            format!("Could not compress \"{name}\" effectively (result was not smaller).")
        }
    }
}
