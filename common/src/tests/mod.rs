mod test_sample;
