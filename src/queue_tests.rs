// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `queue`

#[cfg(test)]
mod tests {
    use crate::queue::WorkQueue;

    #[tokio::test]
    async fn test_add_deduplicates_pending_keys() {
        let queue = WorkQueue::new();
        queue.add("a".to_string());
        queue.add("a".to_string());
        queue.add("b".to_string());
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.get().await.as_deref(), Some("a"));
        assert_eq!(queue.get().await.as_deref(), Some("b"));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_active_key_goes_dirty_and_returns() {
        let queue = WorkQueue::new();
        queue.add("a".to_string());
        let key = queue.get().await.unwrap();

        // Re-added while a worker holds it: not queued yet.
        queue.add("a".to_string());
        assert!(queue.is_empty());

        queue.done(&key);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get().await.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn test_done_without_dirty_leaves_queue_empty() {
        let queue = WorkQueue::new();
        queue.add("a".to_string());
        let key = queue.get().await.unwrap();
        queue.done(&key);
        assert!(queue.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_requeue_returns_key_after_backoff() {
        let queue = WorkQueue::new();
        queue.requeue("a".to_string());
        assert_eq!(queue.get().await.as_deref(), Some("a"));
        queue.done("a");

        // Repeated failures keep coming back despite the growing delay.
        queue.requeue("a".to_string());
        assert_eq!(queue.get().await.as_deref(), Some("a"));
        queue.done("a");
        queue.forget("a");
    }

    #[tokio::test]
    async fn test_shutdown_drains_then_closes() {
        let queue = WorkQueue::new();
        queue.add("a".to_string());
        queue.shutdown();

        // Keys already queued still come out.
        assert_eq!(queue.get().await.as_deref(), Some("a"));
        assert_eq!(queue.get().await, None);
    }

    #[tokio::test]
    async fn test_add_after_shutdown_is_dropped() {
        let queue = WorkQueue::new();
        queue.shutdown();
        queue.add("late".to_string());
        assert_eq!(queue.get().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_waits_for_new_keys() {
        let queue = WorkQueue::new();
        let waiter = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.get().await })
        };
        tokio::task::yield_now().await;
        queue.add("a".to_string());
        assert_eq!(waiter.await.unwrap().as_deref(), Some("a"));
    }
}
