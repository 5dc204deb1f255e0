mod test_buffer;
mod test_reconcile;
